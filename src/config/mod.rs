//! 配置管理模块
//!
//! 提供配置文件加载、校验、缓存和热重载功能

pub mod loader;
pub mod registry;
pub mod store;
pub mod types;
pub mod units;
pub mod watcher;

// 重新导出主要类型
pub use loader::{default_config_dir, ConfigPaths};
pub use registry::ConfigRegistry;
pub use store::ConfigStore;
pub use types::{validate_config, FieldRule, UnitKind};
pub use units::{ConnectionSettings, DatabaseConfig, DeviceConfig, GeneralConfig, LogSettings};
pub use watcher::{ConfigChangeEvent, ConfigWatcher, ReloadOutcome};
