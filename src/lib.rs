//! Shelly Vitals - Shelly 设备轮询工具
//!
//! 从Shelly Cloud拉取设备状态，核心是一个可热重载的JSON配置层：
//! - JSON文本与原生值的双向转换、配置深度合并
//! - 带校验和缓存的配置单元
//! - 按固定顺序管理三个配置单元的注册表
//! - 配置热重载
//! - 结构化日志与配置事件记录

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod json;
pub mod logging;

// 重新导出主要类型
pub use config::{ConfigRegistry, ConfigStore, DatabaseConfig, DeviceConfig, GeneralConfig, UnitKind};
pub use error::{ConfigError, JsonError, ShellyVitalsError};
pub use json::{NativeMap, NativeValue};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
