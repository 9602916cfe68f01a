//! 配置单元类型与校验规则定义
//!
//! 每个配置单元对应一份固定的必需字段清单，校验遇到第一个问题即失败

use crate::error::ConfigFault;
use crate::json::{NativeMap, NativeValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 配置单元种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// 通用配置（日志、更新、系统）
    General,
    /// 数据库配置
    Database,
    /// 设备配置
    Device,
}

impl UnitKind {
    /// 注册表加载顺序
    pub const LOAD_ORDER: [UnitKind; 3] = [UnitKind::General, UnitKind::Database, UnitKind::Device];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::General => "general",
            UnitKind::Database => "database",
            UnitKind::Device => "device",
        }
    }

    /// 默认的配置文件名
    pub fn file_name(&self) -> &'static str {
        match self {
            UnitKind::General => "general.json",
            UnitKind::Database => "database.json",
            UnitKind::Device => "device.json",
        }
    }

    /// 该单元的校验规则
    pub fn schema(&self) -> &'static [FieldRule] {
        match self {
            UnitKind::General => GENERAL_SCHEMA,
            UnitKind::Database => DATABASE_SCHEMA,
            UnitKind::Device => DEVICE_SCHEMA,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(UnitKind::General),
            "database" => Ok(UnitKind::Database),
            "device" => Ok(UnitKind::Device),
            other => Err(format!(
                "未知的配置单元: {other}，支持: general, database, device"
            )),
        }
    }
}

/// 字段类型期望
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// 存在且非空即可
    Present,
    /// 必须是映射
    Map,
    /// 必须是数字
    Number,
}

/// 单条校验规则
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// 点分隔的字段路径
    pub path: &'static str,
    /// 可读描述
    pub label: &'static str,
    /// 类型期望
    pub expect: Expect,
}

const fn rule(path: &'static str, label: &'static str, expect: Expect) -> FieldRule {
    FieldRule {
        path,
        label,
        expect,
    }
}

/// 数据库配置规则
pub const DATABASE_SCHEMA: &[FieldRule] = &[
    rule("url", "数据库URL", Expect::Present),
    rule("username", "用户名", Expect::Present),
    rule("password", "密码", Expect::Present),
    rule("driver", "数据库驱动", Expect::Present),
    rule("pool", "连接池配置", Expect::Map),
    rule("pool.max_size", "连接池最大连接数", Expect::Number),
    rule("pool.timeout", "连接池超时时间", Expect::Number),
];

/// 设备配置规则
pub const DEVICE_SCHEMA: &[FieldRule] = &[
    rule("auth_key", "认证密钥", Expect::Present),
    rule("base_url", "API基础URL", Expect::Present),
    rule("devices", "设备列表", Expect::Map),
];

/// 通用配置规则
pub const GENERAL_SCHEMA: &[FieldRule] = &[
    rule("log", "日志配置", Expect::Map),
    rule("update", "更新配置", Expect::Map),
    rule("system", "系统配置", Expect::Map),
    rule("log.level", "日志级别", Expect::Present),
    rule("log.file_path", "日志文件路径", Expect::Present),
    rule("log.max_size", "日志最大大小", Expect::Number),
    rule("log.retention_days", "日志保留天数", Expect::Number),
    rule("update.interval", "更新间隔", Expect::Number),
    rule("update.retry_count", "重试次数", Expect::Number),
    rule("update.retry_delay", "重试间隔", Expect::Number),
    rule("system.timezone", "时区", Expect::Present),
    rule("system.locale", "区域设置", Expect::Present),
    rule("system.date_format", "日期格式", Expect::Present),
];

/// 按点分隔路径查找值
///
/// 中间任何一段不是映射都返回 `None`
pub fn resolve_path<'a>(config: &'a NativeMap, path: &str) -> Option<&'a NativeValue> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = config.get(first)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// 配置校验函数
///
/// # 参数
/// * `config` - 要校验的配置快照
/// * `schema` - 校验规则
///
/// # 返回
/// * `Result<(), ConfigFault>` - 第一个不满足的字段以 `ConfigFault::Validation` 返回
pub fn validate_config(config: &NativeMap, schema: &[FieldRule]) -> Result<(), ConfigFault> {
    for field in schema {
        let reason = match resolve_path(config, field.path) {
            None | Some(NativeValue::Null) => Some("缺失".to_string()),
            Some(value) => match field.expect {
                Expect::Present => None,
                Expect::Map if value.as_map().is_some() => None,
                Expect::Number if value.is_number() => None,
                Expect::Map => Some(format!("应为映射，实际为 {}", value.kind_name())),
                Expect::Number => Some(format!("应为数字，实际为 {}", value.kind_name())),
            },
        };

        if let Some(reason) = reason {
            return Err(ConfigFault::Validation {
                field: field.path.to_string(),
                label: field.label.to_string(),
                reason,
            });
        }
    }

    Ok(())
}
