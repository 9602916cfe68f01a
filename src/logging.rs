//! 日志系统模块
//!
//! 提供结构化日志配置，以及配置层使用的事件记录器

use crate::config::GeneralConfig;
use log::LevelFilter;
use serde_json::json;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// 根据通用配置单元中的 `log` 段生成日志配置
    ///
    /// 级别无法识别时回退到 info
    pub fn from_general(general: &GeneralConfig) -> Self {
        match general.log_settings() {
            Ok(settings) => Self {
                level: parse_level(&settings.level),
                file_path: Some(PathBuf::from(settings.file_path)),
                console: false,
                ..Default::default()
            },
            Err(_) => Self::default(),
        }
    }
}

/// 解析日志级别字符串（大小写不敏感）
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" | "severe" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" | "fine" => LevelFilter::Debug,
        "trace" | "finest" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// 日志系统管理器
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    ///
    /// 重复调用不会重复安装 subscriber
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = state_mutex.lock().unwrap_or_else(PoisonError::into_inner);
            if state.initialized && !force_reinit {
                if let Some(e) = &state.init_error {
                    return Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e));
                }
                return Ok(Self { config });
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = state_mutex.lock().unwrap_or_else(PoisonError::into_inner);
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)?;
        Ok(())
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => tracing::warn!("忽略无效的模块日志级别 {}: {}", module, e),
            }
        }

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .boxed()
        };

        let result = match (&config.file_path, config.console) {
            (Some(file_path), false) => {
                if let Some(parent) = file_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| anyhow::anyhow!("创建日志目录失败: {}", e))?;
                    }
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let file_layer = fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true);

                registry().with(env_filter).with(file_layer).try_init()
            }
            _ => registry().with(env_filter).with(fmt_layer).try_init(),
        };

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 当前实例的日志配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner).initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE.get().and_then(|state| {
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current_config
                .clone()
        })
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = state_mutex.lock().unwrap_or_else(PoisonError::into_inner);
            *state = GlobalLoggingState::default();
        }
    }
}

/// 配置层的事件记录器
///
/// 在构造失败和状态变化时被调用，实现需要自行吞掉错误
pub trait EventRecorder: Send + Sync {
    /// 记录一条事件
    ///
    /// # 参数
    /// * `source` - 事件来源（组件名）
    /// * `message` - 事件描述
    /// * `details` - 附加信息，可为空
    fn record(&self, source: &str, message: &str, details: &str);
}

/// 通过 tracing 输出事件
#[derive(Debug, Clone, Default)]
pub struct TracingRecorder {
    /// 是否使用JSON格式
    json_format: bool,
}

impl TracingRecorder {
    pub fn new(json_format: bool) -> Self {
        Self { json_format }
    }
}

impl EventRecorder for TracingRecorder {
    fn record(&self, source: &str, message: &str, details: &str) {
        if self.json_format {
            let entry = json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "config_event",
                "source": source,
                "message": message,
                "details": details,
            });
            tracing::info!("{entry}");
        } else {
            tracing::info!(source, details, "EVENT: {}", message);
        }
    }
}

/// 追加写入文件的事件记录器
#[derive(Debug)]
pub struct FileRecorder {
    /// 日志文件路径
    path: PathBuf,
    /// 串行化写入
    lock: Mutex<()>,
}

impl FileRecorder {
    /// 创建文件记录器，必要时创建目录和文件
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// 日志文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 清空日志文件
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = std::fs::write(&self.path, "") {
            tracing::warn!("清空事件日志失败 {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        file.flush()
    }
}

impl EventRecorder for FileRecorder {
    fn record(&self, source: &str, message: &str, details: &str) {
        let entry = format!(
            "\n=== Event Log Entry ===\nTimestamp: {}\nSource: {}\nMessage: {}\nDetails:\n{}\n=======================\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            source,
            message,
            details
        );

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.append(&entry) {
            tracing::warn!("写入事件日志失败 {}: {}", self.path.display(), e);
        }
    }
}

/// 不记录任何内容的记录器（用于测试或禁用记录）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRecorder;

impl EventRecorder for NoOpRecorder {
    fn record(&self, _source: &str, _message: &str, _details: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::{NamedTempFile, TempDir};

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let result1 = LoggingSystem::setup_logging(config.clone());
        assert!(result1.is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次初始化不会重复安装
        let result2 = LoggingSystem::setup_logging(config);
        assert!(result2.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _first = LoggingSystem::setup_logging(config.clone()).unwrap();

        let result = LoggingSystem::setup_logging_with_options(config, true);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;
        config
            .module_levels
            .insert("shelly_vitals::config".to_string(), LevelFilter::Debug);
        let system = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(system.config().json_format);

        let retrieved = LoggingSystem::current_config().unwrap();
        assert_eq!(retrieved.level, config.level);
        assert_eq!(retrieved.json_format, config.json_format);
    }

    #[test]
    fn test_log_config_from_general_unit() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("general.json");
        std::fs::write(
            &path,
            r#"{"log":{"level":"WARNING","file_path":"logs/shelly.log","max_size":10,"retention_days":7},
                "update":{"interval":60,"retry_count":3,"retry_delay":5},
                "system":{"timezone":"UTC","locale":"en_US","date_format":"%Y-%m-%d"}}"#,
        )
        .unwrap();
        let general = GeneralConfig::new(&path, std::sync::Arc::new(NoOpRecorder)).unwrap();

        // 未加载时使用默认值
        let config = LogConfig::from_general(&general);
        assert_eq!(config.level, LevelFilter::Info);
        assert!(config.file_path.is_none());

        general.load().unwrap();
        let config = LogConfig::from_general(&general);
        assert_eq!(config.level, LevelFilter::Warn);
        assert_eq!(config.file_path, Some(PathBuf::from("logs/shelly.log")));
        assert!(!config.console);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO"), LevelFilter::Info);
        assert_eq!(parse_level(" debug "), LevelFilter::Debug);
        assert_eq!(parse_level("WARNING"), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }

    #[test]
    fn test_file_recorder_appends_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.log");
        let recorder = FileRecorder::new(&path).unwrap();

        recorder.record("ConfigRegistry", "初始化成功", "");
        recorder.record("ConfigStore", "加载失败", "missing driver");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("=== Event Log Entry ===").count(), 2);
        assert!(content.contains("Source: ConfigStore"));
        assert!(content.contains("missing driver"));

        recorder.clear();
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn test_file_recorder_swallows_write_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        let recorder = FileRecorder::new(&path).unwrap();

        // 用目录替换文件，使后续写入失败
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        recorder.record("ConfigStore", "不会写入", "");
        assert!(path.is_dir());
    }
}
