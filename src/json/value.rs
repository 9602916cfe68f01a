//! 原生值类型定义
//!
//! JSON转换结果只可能是以下七种形态之一

use std::collections::BTreeMap;
use std::fmt;

/// 字符串键到原生值的映射
pub type NativeMap = BTreeMap<String, NativeValue>;

/// 由JSON值转换得到的原生值
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数（字面量不含小数部分或指数）
    Integer(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 有序列表
    List(Vec<NativeValue>),
    /// 映射
    Map(NativeMap),
}

impl NativeValue {
    /// 类型名称，用于错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Integer(_) => "integer",
            NativeValue::Float(_) => "float",
            NativeValue::String(_) => "string",
            NativeValue::List(_) => "list",
            NativeValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, NativeValue::Integer(_) | NativeValue::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 取整数值
    ///
    /// 小数部分为零的浮点数同样接受（例如 `30.0`），其余情况返回 `None`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Integer(i) => Some(*i),
            NativeValue::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Integer(i) => Some(*i as f64),
            NativeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&NativeMap> {
        match self {
            NativeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// 浮点数按最短可还原形式输出，整数值保留 `.0` 以区分整数
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    match serde_json::Number::from_f64(value) {
        Some(number) => write!(f, "{number}"),
        None => write!(f, "{value}"),
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => write!(f, "null"),
            NativeValue::Bool(b) => write!(f, "{b}"),
            NativeValue::Integer(i) => write!(f, "{i}"),
            NativeValue::Float(value) => write_float(f, *value),
            NativeValue::String(s) => write!(f, "{s}"),
            NativeValue::List(_) | NativeValue::Map(_) => match super::to_json(self) {
                Ok(json) => write!(f, "{json}"),
                Err(_) => write!(f, "{self:?}"),
            },
        }
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Bool(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Integer(value)
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Float(value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(value)
    }
}

impl From<Vec<NativeValue>> for NativeValue {
    fn from(value: Vec<NativeValue>) -> Self {
        NativeValue::List(value)
    }
}

impl From<NativeMap> for NativeValue {
    fn from(value: NativeMap) -> Self {
        NativeValue::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_number_kinds_apart() {
        assert_eq!(NativeValue::Integer(10).to_string(), "10");
        assert_eq!(NativeValue::Float(30.0).to_string(), "30.0");
        assert_eq!(NativeValue::Float(0.25).to_string(), "0.25");
        assert_eq!(NativeValue::Bool(true).to_string(), "true");
        assert_eq!(NativeValue::from("plain").to_string(), "plain");
        assert_eq!(NativeValue::Null.to_string(), "null");
    }

    #[test]
    fn test_display_containers_as_compact_json() {
        let mut map = NativeMap::new();
        map.insert("a".to_string(), NativeValue::Integer(1));
        map.insert(
            "b".to_string(),
            NativeValue::List(vec![NativeValue::from("x"), NativeValue::Null]),
        );

        assert_eq!(NativeValue::Map(map).to_string(), r#"{"a":1,"b":["x",null]}"#);
    }

    #[test]
    fn test_as_i64_accepts_whole_floats_only() {
        assert_eq!(NativeValue::Integer(5).as_i64(), Some(5));
        assert_eq!(NativeValue::Float(5.0).as_i64(), Some(5));
        assert_eq!(NativeValue::Float(5.5).as_i64(), None);
        assert_eq!(NativeValue::from("5").as_i64(), None);
    }

    #[test]
    fn test_as_i64_rejects_floats_outside_range() {
        // 2^63 无法表示为 i64
        assert_eq!(NativeValue::Float(9_223_372_036_854_775_808.0).as_i64(), None);
        assert_eq!(NativeValue::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(NativeValue::Float(i64::MIN as f64).as_i64(), Some(i64::MIN));
        assert_eq!(
            NativeValue::Float(9_007_199_254_740_992.0).as_i64(),
            Some(9_007_199_254_740_992)
        );
    }
}
