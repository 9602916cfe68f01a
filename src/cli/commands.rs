//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::loader::read_config_file;
use crate::config::{ConfigRegistry, ConfigWatcher, UnitKind};
use crate::device::{DevicePoller, DeviceStatus, ShellyCloudClient};
use crate::error::{Result, ShellyVitalsError};
use crate::json::{self, NativeMap};
use crate::logging::{EventRecorder, FileRecorder, TracingRecorder};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 根据参数选择事件记录器
pub fn build_recorder(args: &Args) -> Result<Arc<dyn EventRecorder>> {
    match &args.event_log {
        Some(path) => Ok(Arc::new(FileRecorder::new(path)?)),
        None => Ok(Arc::new(TracingRecorder::new(args.json_logs))),
    }
}

/// 创建并初始化配置注册表
pub fn open_registry(args: &Args) -> Result<Arc<ConfigRegistry>> {
    let registry = ConfigRegistry::new(args.config_paths(), build_recorder(args)?)?;
    registry.initialize()?;
    Ok(Arc::new(registry))
}

/// 校验命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { verbose } = &args.command {
            println!("验证配置目录: {}", args.get_config_dir().display());
            let registry = open_registry(args)?;
            self.report(&registry, *verbose)
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    fn report(&self, registry: &ConfigRegistry, verbose: bool) -> Result<()> {
        for kind in UnitKind::LOAD_ORDER {
            let unit = registry.unit(kind)?;
            println!("✓ {} ({})", kind, unit.path().display());

            if verbose {
                let snapshot = unit.snapshot()?;
                println!("{}", json::to_pretty_string(&snapshot)?);
            }
        }

        if registry.is_all_configurations_loaded() {
            println!("✓ 全部配置单元验证通过");
        }
        Ok(())
    }
}

/// 读取属性命令
pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Get { unit, key } = &args.command {
            let registry = open_registry(args)?;
            println!("{}", registry.unit(*unit)?.get(key)?);
        }
        Ok(())
    }
}

/// 合并命令
pub struct MergeCommand;

#[async_trait]
impl Command for MergeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Merge {
            base,
            overlay,
            output,
        } = &args.command
        {
            let merged = merge_files(base, overlay)?;
            let content = json::to_pretty_string(&merged)?;

            match output {
                Some(path) => {
                    tokio::fs::write(path, content).await?;
                    println!("合并结果已写入: {}", path.display());
                }
                None => println!("{content}"),
            }
        }
        Ok(())
    }
}

/// 读取两个配置文件并深度合并
pub fn merge_files(base: &Path, overlay: &Path) -> Result<NativeMap> {
    let read = |path: &Path| {
        read_config_file(path).map_err(|e| {
            ShellyVitalsError::Other(anyhow::anyhow!("读取 {} 失败: {}", path.display(), e))
        })
    };
    Ok(json::merge_configs(&read(base)?, &read(overlay)?))
}

/// 轮询命令
pub struct PollCommand;

#[async_trait]
impl Command for PollCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Poll { device, format } = &args.command {
            let registry = open_registry(args)?;
            let device_config = registry.device()?;
            let client = ShellyCloudClient::from_config(&device_config)?;
            let poller = DevicePoller::new(Arc::new(client), Arc::clone(&registry));

            match device {
                Some(name) => {
                    let status = poller.poll_once(name).await?;
                    print_status(&status, *format)?;
                }
                None => {
                    for (name, result) in poller.poll_all().await? {
                        match result {
                            Ok(status) => print_status(&status, *format)?,
                            Err(e) => eprintln!("✗ {name}: {e}"),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn print_status(status: &DeviceStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "device": status.device_name,
                "id": status.device_id,
                "isok": status.response.isok,
                "fetched_at": status.fetched_at.to_rfc3339(),
                "data": json::map_to_json(&status.response.data)?,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).map_err(anyhow::Error::from)?
            );
        }
        OutputFormat::Text => {
            let marker = if status.response.is_online() { "●" } else { "○" };
            println!(
                "{} {} ({}) isok={} 在线={}",
                marker,
                status.device_name,
                status.device_id,
                status.response.isok,
                status.response.is_online()
            );
            if let Some(device_status) = status.response.device_status() {
                for (key, value) in device_status {
                    println!("    {key}: {value}");
                }
            }
        }
    }
    Ok(())
}

/// 热重载监控命令
pub struct WatchCommand;

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Watch { debounce_ms } = &args.command {
            let registry = open_registry(args)?;
            let (mut watcher, mut receiver) =
                ConfigWatcher::new(Arc::clone(&registry), Duration::from_millis(*debounce_ms));
            watcher.start()?;

            info!("正在监控配置目录，按 Ctrl+C 退出");

            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Ok(change) if change.outcome.is_success() => {
                            info!("配置单元 {} 已重载，版本: {}", change.unit, change.version);
                        }
                        Ok(change) => {
                            warn!("配置单元 {} 重载失败，继续使用原有配置: {:?}", change.unit, change.outcome);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("跳过了 {} 个配置变更事件", skipped);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("收到关闭信号，正在停止监控...");
                        break;
                    }
                }
            }

            watcher.stop();
            registry.shutdown();
        }
        Ok(())
    }
}
