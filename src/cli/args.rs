//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::{default_config_dir, ConfigPaths, UnitKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shelly Vitals - Shelly 设备轮询与配置管理工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shelly-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置目录
    #[arg(
        short,
        long,
        value_name = "DIR",
        help = "配置目录（包含 general.json、database.json、device.json）",
        env = "SHELLY_VITALS_CONFIG_DIR"
    )]
    pub config_dir: Option<PathBuf>,

    /// 日志级别，未指定时使用 general.json 中的 log.level
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "SHELLY_VITALS_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 使用JSON格式输出日志
    #[arg(long, help = "使用JSON格式输出日志")]
    pub json_logs: bool,

    /// 配置事件记录文件
    #[arg(
        long,
        value_name = "FILE",
        help = "配置事件记录文件（默认写入日志）"
    )]
    pub event_log: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 加载并校验全部配置单元
    Validate {
        /// 显示每个单元的完整内容
        #[arg(short, long, help = "显示每个单元的完整内容")]
        verbose: bool,
    },

    /// 读取单个配置属性
    Get {
        /// 配置单元（general、database、device）
        #[arg(help = "配置单元（general、database、device）")]
        unit: UnitKind,

        /// 属性名，支持 section.key 形式
        #[arg(help = "属性名，支持 section.key 形式")]
        key: String,
    },

    /// 深度合并两个JSON配置文件
    Merge {
        /// 基础配置文件
        #[arg(value_name = "BASE", help = "基础配置文件")]
        base: PathBuf,

        /// 覆盖配置文件
        #[arg(value_name = "OVERRIDE", help = "覆盖配置文件，冲突时优先")]
        overlay: PathBuf,

        /// 输出文件，未指定时输出到标准输出
        #[arg(short, long, value_name = "FILE", help = "输出文件")]
        output: Option<PathBuf>,
    },

    /// 拉取设备状态
    Poll {
        /// 设备名称，未指定时拉取全部设备
        #[arg(help = "设备名称，未指定时拉取全部设备")]
        device: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 监控配置目录并热重载
    Watch {
        /// 防抖动延迟（毫秒）
        #[arg(long, value_name = "MILLIS", default_value_t = 500, help = "防抖动延迟（毫秒）")]
        debounce_ms: u64,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取配置目录
    pub fn get_config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(default_config_dir)
    }

    /// 三个配置单元的文件路径
    pub fn config_paths(&self) -> ConfigPaths {
        ConfigPaths::in_dir(self.get_config_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_command() {
        let args = Args::try_parse_from([
            "shelly-vitals",
            "--config-dir",
            "/etc/shelly",
            "get",
            "Database",
            "pool.max_size",
        ])
        .unwrap();

        match &args.command {
            Commands::Get { unit, key } => {
                assert_eq!(*unit, UnitKind::Database);
                assert_eq!(key, "pool.max_size");
            }
            other => panic!("期望 get 命令，实际为 {other:?}"),
        }
        assert_eq!(
            args.config_paths().database,
            PathBuf::from("/etc/shelly/database.json")
        );
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let result = Args::try_parse_from(["shelly-vitals", "get", "network", "url"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_poll_defaults() {
        let args = Args::try_parse_from(["shelly-vitals", "poll"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Poll {
                device: None,
                format: OutputFormat::Text
            }
        ));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }
}
