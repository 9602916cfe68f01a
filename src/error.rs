//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use crate::config::UnitKind;
use thiserror::Error;

/// Shelly Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ShellyVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// JSON转换错误
    #[error("JSON转换错误: {0}")]
    Json(#[from] JsonError),

    /// 设备API错误
    #[error("设备API错误: {0}")]
    Device(#[from] DeviceError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// JSON转换引擎错误类型
#[derive(Error, Debug)]
pub enum JsonError {
    /// 输入不是合法的JSON文档
    #[error("JSON格式错误: {0}")]
    MalformedInput(#[source] serde_json::Error),

    /// 值无法用JSON表示
    #[error("不支持的类型: {0}")]
    UnsupportedType(String),
}

/// 配置加载/保存失败的具体原因
#[derive(Error, Debug)]
pub enum ConfigFault {
    /// 读写配置文件失败
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件内容解析失败
    #[error("解析失败: {0}")]
    Parse(#[source] JsonError),

    /// 缺少必需字段或字段类型不符
    #[error("必需字段 {field}（{label}）无效: {reason}")]
    Validation {
        /// 字段路径，例如 `pool.timeout`
        field: String,
        /// 字段的可读描述
        label: String,
        /// 失败原因
        reason: String,
    },

    /// 缓存无法序列化为JSON
    #[error("序列化失败: {0}")]
    Serialize(#[source] JsonError),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 加载或重载失败
    #[error("加载配置单元 {unit} 失败: {cause}")]
    Load {
        unit: UnitKind,
        #[source]
        cause: ConfigFault,
    },

    /// 保存失败
    #[error("保存配置单元 {unit} 失败: {cause}")]
    Save {
        unit: UnitKind,
        #[source]
        cause: ConfigFault,
    },

    /// 配置尚未加载
    #[error("配置单元 {unit} 尚未加载，请先调用 load()")]
    NotLoaded { unit: UnitKind },

    /// 属性不存在
    #[error("配置单元 {unit} 中找不到属性: {key}")]
    PropertyNotFound { unit: UnitKind, key: String },

    /// 属性存在但类型不符
    #[error("配置单元 {unit} 的属性 {key} 类型不符，期望 {expected}")]
    TypeMismatch {
        unit: UnitKind,
        key: String,
        expected: &'static str,
    },

    /// 注册表已初始化
    #[error("配置注册表已经初始化")]
    AlreadyInitialized,

    /// 注册表未初始化
    #[error("配置注册表尚未初始化")]
    NotInitialized,

    /// 无法创建配置目录
    #[error("无法创建配置目录 {path}: {source}")]
    DirectoryCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// 返回缺失字段的路径（仅对校验失败有意义）
    pub fn missing_field(&self) -> Option<&str> {
        match self {
            ConfigError::Load {
                cause: ConfigFault::Validation { field, .. },
                ..
            }
            | ConfigError::Save {
                cause: ConfigFault::Validation { field, .. },
                ..
            } => Some(field.as_str()),
            _ => None,
        }
    }

    /// 是否为IO层面的失败
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ConfigError::Load {
                cause: ConfigFault::Io(_),
                ..
            } | ConfigError::Save {
                cause: ConfigFault::Io(_),
                ..
            } | ConfigError::DirectoryCreation { .. }
        )
    }
}

/// 设备API错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    /// HTTP请求错误
    #[error("HTTP请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 状态码不是200
    #[error("获取设备状态失败，状态码: {status}")]
    Status { status: u16 },

    /// 响应体无法解析
    #[error("设备响应解析失败: {0}")]
    Response(#[from] JsonError),

    /// 设备未在配置中登记
    #[error("设备未找到: {name}")]
    UnknownDevice { name: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ShellyVitalsError>;
