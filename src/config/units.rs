//! 类型化配置单元
//!
//! 在 `ConfigStore` 之上为三个配置单元提供强类型访问器

use crate::config::store::ConfigStore;
use crate::config::types::{resolve_path, UnitKind};
use crate::error::ConfigError;
use crate::json::{NativeMap, NativeValue};
use crate::logging::EventRecorder;
use serde::Serialize;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// 读取字段的字符串形式
fn text_at(kind: UnitKind, config: &NativeMap, path: &str) -> Result<String, ConfigError> {
    resolve_path(config, path)
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::PropertyNotFound {
            unit: kind,
            key: path.to_string(),
        })
}

/// 读取非负整数字段
fn non_negative_at(kind: UnitKind, config: &NativeMap, path: &str) -> Result<u64, ConfigError> {
    let value = resolve_path(config, path).ok_or_else(|| ConfigError::PropertyNotFound {
        unit: kind,
        key: path.to_string(),
    })?;
    let integer = value.as_i64().ok_or_else(|| ConfigError::TypeMismatch {
        unit: kind,
        key: path.to_string(),
        expected: "整数",
    })?;
    u64::try_from(integer).map_err(|_| ConfigError::TypeMismatch {
        unit: kind,
        key: path.to_string(),
        expected: "非负整数",
    })
}

fn non_negative(store: &ConfigStore, path: &str) -> Result<u64, ConfigError> {
    let snapshot = store.snapshot()?;
    non_negative_at(store.kind(), &snapshot, path)
}

macro_rules! config_unit {
    ($name:ident, $kind:expr) => {
        impl $name {
            /// 创建配置单元（尚未加载）
            pub fn new<P: AsRef<Path>>(
                path: P,
                recorder: Arc<dyn EventRecorder>,
            ) -> Result<Self, ConfigError> {
                Ok(Self {
                    store: ConfigStore::new($kind, path, recorder)?,
                })
            }

            /// 底层配置存储
            pub fn store(&self) -> &ConfigStore {
                &self.store
            }
        }

        impl Deref for $name {
            type Target = ConfigStore;

            fn deref(&self) -> &ConfigStore {
                &self.store
            }
        }
    };
}

/// 数据库配置单元
#[derive(Debug)]
pub struct DatabaseConfig {
    store: ConfigStore,
}

config_unit!(DatabaseConfig, UnitKind::Database);

/// 持久层使用的连接参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub driver: String,
    pub pool_max_size: u64,
    /// 连接池超时时间（秒）
    pub pool_timeout: u64,
}

impl DatabaseConfig {
    pub fn url(&self) -> Result<String, ConfigError> {
        self.get("url")
    }

    pub fn username(&self) -> Result<String, ConfigError> {
        self.get("username")
    }

    pub fn password(&self) -> Result<String, ConfigError> {
        self.get("password")
    }

    pub fn driver(&self) -> Result<String, ConfigError> {
        self.get("driver")
    }

    pub fn pool_max_size(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "pool.max_size")
    }

    pub fn pool_timeout(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "pool.timeout")
    }

    /// 一次性取出全部连接参数
    ///
    /// 所有字段来自同一份快照，与并发的重载互不交叉
    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConfigError> {
        let snapshot = self.snapshot()?;
        let kind = UnitKind::Database;

        Ok(ConnectionSettings {
            url: text_at(kind, &snapshot, "url")?,
            username: text_at(kind, &snapshot, "username")?,
            password: text_at(kind, &snapshot, "password")?,
            driver: text_at(kind, &snapshot, "driver")?,
            pool_max_size: non_negative_at(kind, &snapshot, "pool.max_size")?,
            pool_timeout: non_negative_at(kind, &snapshot, "pool.timeout")?,
        })
    }
}

/// 设备配置单元
#[derive(Debug)]
pub struct DeviceConfig {
    store: ConfigStore,
}

config_unit!(DeviceConfig, UnitKind::Device);

impl DeviceConfig {
    pub fn auth_key(&self) -> Result<String, ConfigError> {
        self.get("auth_key")
    }

    pub fn base_url(&self) -> Result<String, ConfigError> {
        self.get("base_url")
    }

    /// 按设备名称查找设备ID
    ///
    /// # 参数
    /// * `name` - `devices` 映射中的设备名称
    ///
    /// # 返回
    /// * `Result<String, ConfigError>` - 设备ID；数字ID按十进制返回
    pub fn device_id(&self, name: &str) -> Result<String, ConfigError> {
        match self.nested_value("devices", name)? {
            NativeValue::String(id) => Ok(id),
            value @ NativeValue::Integer(_) => Ok(value.to_string()),
            _ => Err(ConfigError::TypeMismatch {
                unit: UnitKind::Device,
                key: format!("devices.{name}"),
                expected: "字符串或整数",
            }),
        }
    }

    /// 已登记的全部设备名称（按名称排序）
    pub fn device_names(&self) -> Result<Vec<String>, ConfigError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .get("devices")
            .and_then(NativeValue::as_map)
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default())
    }
}

/// `log` 段中日志系统使用的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file_path: String,
}

/// 通用配置单元
#[derive(Debug)]
pub struct GeneralConfig {
    store: ConfigStore,
}

config_unit!(GeneralConfig, UnitKind::General);

impl GeneralConfig {
    /// 从同一份快照读取日志级别和日志文件路径
    pub fn log_settings(&self) -> Result<LogSettings, ConfigError> {
        let snapshot = self.snapshot()?;

        Ok(LogSettings {
            level: text_at(UnitKind::General, &snapshot, "log.level")?,
            file_path: text_at(UnitKind::General, &snapshot, "log.file_path")?,
        })
    }

    pub fn log_level(&self) -> Result<String, ConfigError> {
        self.get_nested("log", "level")
    }

    pub fn log_file_path(&self) -> Result<String, ConfigError> {
        self.get_nested("log", "file_path")
    }

    pub fn log_max_size(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "log.max_size")
    }

    pub fn log_retention_days(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "log.retention_days")
    }

    /// 轮询间隔（秒）
    pub fn update_interval(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "update.interval")
    }

    pub fn update_retry_count(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "update.retry_count")
    }

    /// 重试间隔（秒）
    pub fn update_retry_delay(&self) -> Result<u64, ConfigError> {
        non_negative(&self.store, "update.retry_delay")
    }

    pub fn system_timezone(&self) -> Result<String, ConfigError> {
        self.get_nested("system", "timezone")
    }

    pub fn system_locale(&self) -> Result<String, ConfigError> {
        self.get_nested("system", "locale")
    }

    pub fn system_date_format(&self) -> Result<String, ConfigError> {
        self.get_nested("system", "date_format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpRecorder;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_database_connection_settings() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "database.json",
            r#"{"url":"jdbc:mysql://localhost/db","username":"u","password":"secret","driver":"d","pool":{"max_size":10,"timeout":30}}"#,
        );
        let database = DatabaseConfig::new(path, Arc::new(NoOpRecorder)).unwrap();
        database.load().unwrap();

        let settings = database.connection_settings().unwrap();

        assert_eq!(settings.url, "jdbc:mysql://localhost/db");
        assert_eq!(settings.password, "secret");
        assert_eq!(settings.pool_max_size, 10);
        assert_eq!(settings.pool_timeout, 30);

        let serialized = serde_json::to_string(&settings).unwrap();
        assert!(!serialized.contains("secret"));
    }

    #[test]
    fn test_fractional_pool_size_is_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "database.json",
            r#"{"url":"u","username":"u","password":"p","driver":"d","pool":{"max_size":2.5,"timeout":-1}}"#,
        );
        let database = DatabaseConfig::new(path, Arc::new(NoOpRecorder)).unwrap();
        database.load().unwrap();

        assert!(matches!(
            database.pool_max_size(),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            database.pool_timeout(),
            Err(ConfigError::TypeMismatch { expected: "非负整数", .. })
        ));
    }

    #[test]
    fn test_device_lookup() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "device.json",
            r#"{"auth_key":"k","base_url":"https://shelly-example.cloud","devices":{"kitchen":"abc123","garage":42,"bad":[1]}}"#,
        );
        let device = DeviceConfig::new(path, Arc::new(NoOpRecorder)).unwrap();
        device.load().unwrap();

        assert_eq!(device.auth_key().unwrap(), "k");
        assert_eq!(device.device_id("kitchen").unwrap(), "abc123");
        assert_eq!(device.device_id("garage").unwrap(), "42");
        assert!(matches!(
            device.device_id("bad"),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            device.device_id("attic"),
            Err(ConfigError::PropertyNotFound { .. })
        ));
        assert_eq!(device.device_names().unwrap(), vec!["bad", "garage", "kitchen"]);
    }

    #[test]
    fn test_general_accessors() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "general.json",
            r#"{
                "log": {"level": "debug", "file_path": "logs/app.log", "max_size": 10, "retention_days": 7},
                "update": {"interval": 60, "retry_count": 3, "retry_delay": 5},
                "system": {"timezone": "Europe/Berlin", "locale": "de_DE", "date_format": "%Y-%m-%d"}
            }"#,
        );
        let general = GeneralConfig::new(path, Arc::new(NoOpRecorder)).unwrap();
        general.load().unwrap();

        assert_eq!(general.log_level().unwrap(), "debug");
        assert_eq!(general.log_file_path().unwrap(), "logs/app.log");
        assert_eq!(
            general.log_settings().unwrap(),
            LogSettings {
                level: "debug".to_string(),
                file_path: "logs/app.log".to_string(),
            }
        );
        assert_eq!(general.log_max_size().unwrap(), 10);
        assert_eq!(general.log_retention_days().unwrap(), 7);
        assert_eq!(general.update_interval().unwrap(), 60);
        assert_eq!(general.update_retry_count().unwrap(), 3);
        assert_eq!(general.update_retry_delay().unwrap(), 5);
        assert_eq!(general.system_timezone().unwrap(), "Europe/Berlin");
        assert_eq!(general.system_locale().unwrap(), "de_DE");
        assert_eq!(general.system_date_format().unwrap(), "%Y-%m-%d");
    }

    #[test]
    fn test_accessors_require_load() {
        let dir = TempDir::new().unwrap();
        let general =
            GeneralConfig::new(dir.path().join("general.json"), Arc::new(NoOpRecorder)).unwrap();

        assert!(matches!(
            general.log_level(),
            Err(ConfigError::NotLoaded { unit: UnitKind::General })
        ));
    }
}
