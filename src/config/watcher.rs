//! 配置文件监控模块
//!
//! 监控三个配置单元所在目录，文件变更后经防抖动处理重载对应单元，
//! 并通过广播通道发布每一次重载尝试

use crate::config::registry::ConfigRegistry;
use crate::config::types::UnitKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 一次重载尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// 重载成功，单元使用新快照
    Reloaded,
    /// 重载失败，单元保留之前的快照
    Failed(String),
}

impl ReloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReloadOutcome::Reloaded)
    }
}

/// 配置变更事件
#[derive(Debug, Clone)]
pub struct ConfigChangeEvent {
    /// 发生变更的配置单元
    pub unit: UnitKind,
    /// 配置文件路径
    pub path: PathBuf,
    /// 重载序号，从1开始递增
    pub version: u64,
    /// 重载完成时间
    pub timestamp: DateTime<Utc>,
    /// 重载结果
    pub outcome: ReloadOutcome,
}

/// 配置文件监控器
pub struct ConfigWatcher {
    /// 配置注册表
    registry: Arc<ConfigRegistry>,
    /// 文件系统监控器
    watcher: Option<RecommendedWatcher>,
    /// 事件处理任务
    task: Option<JoinHandle<()>>,
    /// 事件发送器
    event_sender: broadcast::Sender<ConfigChangeEvent>,
    /// 防抖动延迟
    debounce_delay: Duration,
}

impl ConfigWatcher {
    /// 创建新的配置监控器
    ///
    /// # 参数
    /// * `registry` - 变更时要重载的配置注册表
    /// * `debounce_delay` - 防抖动延迟时间
    ///
    /// # 返回
    /// * `(Self, broadcast::Receiver<ConfigChangeEvent>)` - 监控器和事件接收器
    pub fn new(
        registry: Arc<ConfigRegistry>,
        debounce_delay: Duration,
    ) -> (Self, broadcast::Receiver<ConfigChangeEvent>) {
        let (event_sender, event_receiver) = broadcast::channel(32);

        let watcher = Self {
            registry,
            watcher: None,
            task: None,
            event_sender,
            debounce_delay,
        };

        (watcher, event_receiver)
    }

    /// 启动配置文件监控
    ///
    /// 必须在tokio运行时中调用
    pub fn start(&mut self) -> Result<()> {
        let targets = Self::watch_targets(&self.registry);
        let directories: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|(_, path)| path.parent().map(Path::to_path_buf))
            .collect();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // 接收端关闭说明监控已停止
                let _ = tx.send(res);
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .context("创建文件监控器失败")?;

        for directory in &directories {
            watcher
                .watch(directory, RecursiveMode::NonRecursive)
                .with_context(|| format!("监控目录失败: {}", directory.display()))?;
            info!("启动配置目录监控: {}", directory.display());
        }

        self.watcher = Some(watcher);

        let registry = Arc::clone(&self.registry);
        let event_sender = self.event_sender.clone();
        let debounce_delay = self.debounce_delay;

        self.task = Some(tokio::spawn(async move {
            Self::handle_file_events(rx, targets, registry, event_sender, debounce_delay).await;
        }));

        info!("配置热重载已启动");
        Ok(())
    }

    /// 规范化后的各单元文件路径
    fn watch_targets(registry: &ConfigRegistry) -> Vec<(UnitKind, PathBuf)> {
        UnitKind::LOAD_ORDER
            .into_iter()
            .map(|kind| (kind, normalize(registry.paths().for_unit(kind))))
            .collect()
    }

    /// 处理文件系统事件
    async fn handle_file_events(
        mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        targets: Vec<(UnitKind, PathBuf)>,
        registry: Arc<ConfigRegistry>,
        event_sender: broadcast::Sender<ConfigChangeEvent>,
        debounce_delay: Duration,
    ) {
        let mut last_event_time: HashMap<UnitKind, Instant> = HashMap::new();
        let mut version = 1u64;

        while let Some(res) = rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("文件监控事件错误: {}", e);
                    continue;
                }
            };

            let Some((kind, path)) = Self::match_unit_event(&event, &targets) else {
                continue;
            };

            debug!("检测到配置单元 {} 的文件变更: {:?}", kind, event.kind);

            let now = Instant::now();
            if let Some(last_time) = last_event_time.get(&kind) {
                if now.duration_since(*last_time) < debounce_delay {
                    debug!("跳过重复事件（防抖动）");
                    continue;
                }
            }
            last_event_time.insert(kind, now);

            // 延迟处理，确保文件写入完成
            tokio::time::sleep(debounce_delay).await;

            let change = Self::reload_unit(Arc::clone(&registry), kind, path, version).await;
            version += 1;

            if event_sender.send(change).is_err() {
                debug!("没有配置变更事件的订阅者");
            }
        }

        debug!("配置文件事件处理任务结束");
    }

    /// 查找事件对应的配置单元
    fn match_unit_event(event: &Event, targets: &[(UnitKind, PathBuf)]) -> Option<(UnitKind, PathBuf)> {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return None;
        }

        event.paths.iter().find_map(|event_path| {
            let event_path = normalize(event_path);
            targets
                .iter()
                .find(|(_, target)| *target == event_path)
                .cloned()
        })
    }

    /// 在阻塞线程中重载单元并生成变更事件
    async fn reload_unit(
        registry: Arc<ConfigRegistry>,
        kind: UnitKind,
        path: PathBuf,
        version: u64,
    ) -> ConfigChangeEvent {
        let outcome = match tokio::task::spawn_blocking(move || registry.reload_unit(kind)).await {
            Ok(Ok(())) => {
                info!("配置单元 {} 重载成功，版本: {}", kind, version);
                ReloadOutcome::Reloaded
            }
            Ok(Err(e)) => {
                warn!("配置单元 {} 重载失败，保留原有配置: {}", kind, e);
                ReloadOutcome::Failed(e.to_string())
            }
            Err(e) => {
                error!("配置重载任务异常: {}", e);
                ReloadOutcome::Failed(e.to_string())
            }
        };

        ConfigChangeEvent {
            unit: kind,
            path,
            version,
            timestamp: Utc::now(),
            outcome,
        }
    }

    /// 订阅配置变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.event_sender.subscribe()
    }

    /// 是否正在监控
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// 停止监控
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            info!("配置热重载已停止");
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 规范化路径：目录部分解析为绝对路径，文件本身可以不存在
fn normalize(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}
