//! Shelly Vitals 主程序入口

use anyhow::{Context, Result};
use clap::Parser;
use shelly_vitals::cli::args::{Args, Commands};
use shelly_vitals::cli::commands::{
    Command, GetCommand, MergeCommand, PollCommand, ValidateCommand, WatchCommand,
};
use shelly_vitals::config::GeneralConfig;
use shelly_vitals::logging::{LogConfig, LoggingSystem, NoOpRecorder};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = build_log_config(&args);
    let _logging_system =
        LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Shelly Vitals v{} 启动", shelly_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// 生成日志配置
///
/// 命令行指定了级别时直接使用，输出到控制台；否则尝试读取
/// general.json 的 `log` 段，读取失败时使用默认配置
fn build_log_config(args: &Args) -> LogConfig {
    let mut config = match args.log_level {
        Some(level) => LogConfig {
            level: level.into(),
            ..Default::default()
        },
        None => GeneralConfig::new(&args.config_paths().general, Arc::new(NoOpRecorder))
            .ok()
            .filter(|general| general.load().is_ok())
            .map(|general| LogConfig::from_general(&general))
            .unwrap_or_default(),
    };
    config.json_format = args.json_logs;
    config
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Get { .. } => Box::new(GetCommand),
        Commands::Merge { .. } => Box::new(MergeCommand),
        Commands::Poll { .. } => Box::new(PollCommand),
        Commands::Watch { .. } => Box::new(WatchCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
