//! JSON值与原生值之间的转换
//!
//! 所有函数都是纯内存变换，不做任何IO

use crate::error::JsonError;
use crate::json::value::{NativeMap, NativeValue};
use serde_json::{Map, Number, Value};

/// 解析JSON文本
///
/// # 参数
/// * `text` - JSON文本，必须恰好包含一个完整的JSON文档
///
/// # 返回
/// * `Result<Value, JsonError>` - 解析结果，格式错误时返回 `MalformedInput`
pub fn parse(text: &str) -> Result<Value, JsonError> {
    serde_json::from_str(text).map_err(JsonError::MalformedInput)
}

/// 解析JSON文本并直接转换为原生值
pub fn parse_native(text: &str) -> Result<NativeValue, JsonError> {
    parse(text).map(|value| to_native(&value))
}

/// 将JSON值转换为原生值
///
/// 对象成员中值为 `null` 的键会被丢弃；数组中的 `null` 元素保留
pub fn to_native(value: &Value) -> NativeValue {
    match value {
        Value::Null => NativeValue::Null,
        Value::Bool(b) => NativeValue::Bool(*b),
        Value::Number(number) => number_to_native(number),
        Value::String(s) => NativeValue::String(s.clone()),
        Value::Array(items) => NativeValue::List(items.iter().map(to_native).collect()),
        Value::Object(members) => NativeValue::Map(object_to_native(members)),
    }
}

fn object_to_native(members: &Map<String, Value>) -> NativeMap {
    members
        .iter()
        .filter(|(_, member)| !member.is_null())
        .map(|(key, member)| (key.clone(), to_native(member)))
        .collect()
}

fn number_to_native(number: &Number) -> NativeValue {
    if let Some(i) = number.as_i64() {
        return NativeValue::Integer(i);
    }
    // 超出 i64 范围的整数与带小数/指数的字面量一样按浮点处理
    match number.as_f64() {
        Some(f) => NativeValue::Float(f),
        None => NativeValue::Null,
    }
}

/// 将JSON值转换为映射
///
/// 对象直接转换；数组包装为 `{"array": [...]}`；其他标量包装为 `{"value": x}`；
/// `null` 得到空映射
pub fn to_native_map(value: &Value) -> NativeMap {
    let mut result = NativeMap::new();
    match value {
        Value::Null => {}
        Value::Object(members) => result = object_to_native(members),
        Value::Array(_) => {
            result.insert("array".to_string(), to_native(value));
        }
        _ => {
            result.insert("value".to_string(), to_native(value));
        }
    }
    result
}

/// 将原生值转换回JSON值
///
/// # 返回
/// * `Result<Value, JsonError>` - 无法用JSON表示的值（非有限浮点数）返回 `UnsupportedType`
pub fn to_json(value: &NativeValue) -> Result<Value, JsonError> {
    Ok(match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Integer(i) => Value::Number(Number::from(*i)),
        NativeValue::Float(f) => Value::Number(Number::from_f64(*f).ok_or_else(|| {
            JsonError::UnsupportedType(format!("非有限浮点数 {f} 无法写入JSON"))
        })?),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::List(items) => {
            Value::Array(items.iter().map(to_json).collect::<Result<Vec<_>, _>>()?)
        }
        NativeValue::Map(map) => Value::Object(map_to_json(map)?),
    })
}

/// 将映射转换为JSON对象
pub fn map_to_json(map: &NativeMap) -> Result<Map<String, Value>, JsonError> {
    map.iter()
        .map(|(key, member)| Ok((key.clone(), to_json(member)?)))
        .collect()
}

/// 将映射序列化为格式化的JSON文本
pub fn to_pretty_string(map: &NativeMap) -> Result<String, JsonError> {
    let object = Value::Object(map_to_json(map)?);
    serde_json::to_string_pretty(&object).map_err(|e| JsonError::UnsupportedType(e.to_string()))
}

/// 深度合并两个映射
///
/// 两侧同名键都是映射时递归合并，其余情况覆盖值直接生效（后写者胜）
pub fn merge_configs(base: &NativeMap, overlay: &NativeMap) -> NativeMap {
    let mut result = base.clone();

    for (key, value) in overlay {
        let merged = match (result.get(key), value) {
            (Some(NativeValue::Map(base_map)), NativeValue::Map(overlay_map)) => {
                NativeValue::Map(merge_configs(base_map, overlay_map))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }

    result
}
