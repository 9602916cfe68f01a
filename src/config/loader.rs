//! 配置文件读写
//!
//! 负责配置文件的读取、解析、写回以及默认路径解析

use crate::config::types::UnitKind;
use crate::error::{ConfigError, ConfigFault, JsonError};
use crate::json::{self, NativeMap, NativeValue};
use std::path::{Path, PathBuf};

/// 从字符串解析配置
///
/// # 参数
/// * `content` - 配置文件内容
///
/// # 返回
/// * `Result<NativeMap, ConfigFault>` - 根节点必须是JSON对象
pub fn load_from_string(content: &str) -> Result<NativeMap, ConfigFault> {
    match json::parse_native(content).map_err(ConfigFault::Parse)? {
        NativeValue::Map(map) => Ok(map),
        other => Err(ConfigFault::Parse(JsonError::UnsupportedType(format!(
            "配置文件根节点必须是对象，实际为 {}",
            other.kind_name()
        )))),
    }
}

/// 读取并解析配置文件
pub fn read_config_file(path: &Path) -> Result<NativeMap, ConfigFault> {
    let content = std::fs::read_to_string(path)?;
    let config = load_from_string(&content)?;
    tracing::debug!("读取配置文件: {}，顶层字段数: {}", path.display(), config.len());
    Ok(config)
}

/// 将整个配置写回文件
pub fn write_config_file(path: &Path, config: &NativeMap) -> Result<(), ConfigFault> {
    let content = json::to_pretty_string(config).map_err(ConfigFault::Serialize)?;
    std::fs::write(path, content)?;
    tracing::debug!("写入配置文件: {}", path.display());
    Ok(())
}

/// 确保配置文件所在目录存在
pub fn ensure_parent_dir(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreation {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

/// 三个配置单元的文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub general: PathBuf,
    pub database: PathBuf,
    pub device: PathBuf,
}

impl ConfigPaths {
    /// 在指定目录下使用标准文件名
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            general: dir.join(UnitKind::General.file_name()),
            database: dir.join(UnitKind::Database.file_name()),
            device: dir.join(UnitKind::Device.file_name()),
        }
    }

    /// 获取指定单元的路径
    pub fn for_unit(&self, kind: UnitKind) -> &Path {
        match kind {
            UnitKind::General => &self.general,
            UnitKind::Database => &self.database,
            UnitKind::Device => &self.device,
        }
    }
}

/// 获取默认配置目录
pub fn default_config_dir() -> PathBuf {
    // 优先使用当前目录下的 config/，否则使用系统配置目录
    if Path::new("config").is_dir() {
        PathBuf::from("config")
    } else {
        dirs::config_dir()
            .map(|config_dir| config_dir.join(crate::APP_NAME))
            .unwrap_or_else(|| PathBuf::from("config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_string_requires_object_root() {
        assert!(load_from_string(r#"{"a": 1}"#).is_ok());
        assert!(matches!(
            load_from_string("[1, 2]"),
            Err(ConfigFault::Parse(JsonError::UnsupportedType(_)))
        ));
        assert!(matches!(
            load_from_string("{broken"),
            Err(ConfigFault::Parse(JsonError::MalformedInput(_)))
        ));
    }

    #[test]
    fn test_read_missing_file_is_io_fault() {
        let dir = TempDir::new().unwrap();
        let result = read_config_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigFault::Io(_))));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unit.json");
        let config = load_from_string(r#"{"name":"x","pool":{"max_size":3}}"#).unwrap();

        write_config_file(&path, &config).unwrap();

        assert_eq!(read_config_file(&path).unwrap(), config);
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("unit.json");

        ensure_parent_dir(&path).unwrap();

        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_config_paths_in_dir() {
        let paths = ConfigPaths::in_dir("/etc/shelly");
        assert_eq!(paths.general, PathBuf::from("/etc/shelly/general.json"));
        assert_eq!(
            paths.for_unit(UnitKind::Database),
            Path::new("/etc/shelly/database.json")
        );
        assert_eq!(paths.device, PathBuf::from("/etc/shelly/device.json"));
    }

    #[test]
    fn test_default_config_dir() {
        let dir = default_config_dir();
        assert!(dir.to_string_lossy().contains("config") || dir.ends_with(crate::APP_NAME));
    }
}
