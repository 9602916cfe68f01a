//! 设备响应解析

use crate::error::JsonError;
use crate::json::{self, NativeMap, NativeValue};
use serde_json::Value;

/// Shelly Cloud 设备状态响应
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceResponse {
    /// 接口是否成功
    pub isok: bool,
    /// `data` 字段转换后的映射
    pub data: NativeMap,
}

impl DeviceResponse {
    /// 设备是否在线（`data.online`）
    pub fn is_online(&self) -> bool {
        self.data
            .get("online")
            .and_then(NativeValue::as_bool)
            .unwrap_or(false)
    }

    /// 设备上报的状态（`data.device_status`）
    pub fn device_status(&self) -> Option<&NativeMap> {
        self.data.get("device_status").and_then(NativeValue::as_map)
    }
}

/// 解析设备状态响应
///
/// # 参数
/// * `text` - 接口返回的原始JSON文本
///
/// # 返回
/// * `Result<DeviceResponse, JsonError>` - 根节点必须是对象；缺少 `isok` 视为失败，
///   缺少 `data` 得到空映射
pub fn parse_response(text: &str) -> Result<DeviceResponse, JsonError> {
    let Value::Object(object) = json::parse(text)? else {
        return Err(JsonError::UnsupportedType(
            "设备响应根节点必须是对象".to_string(),
        ));
    };

    let isok = object.get("isok").and_then(Value::as_bool).unwrap_or(false);
    let data = object.get("data").map(json::to_native_map).unwrap_or_default();

    Ok(DeviceResponse { isok, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_response() {
        let text = r#"{
            "isok": true,
            "data": {
                "online": true,
                "device_status": {"total_power": 12.5, "emeters": [{"power": 1.0}], "cloud": null}
            }
        }"#;

        let response = parse_response(text).unwrap();

        assert!(response.isok);
        assert!(response.is_online());
        let status = response.device_status().unwrap();
        assert_eq!(status.get("total_power"), Some(&NativeValue::Float(12.5)));
        assert!(status.get("emeters").and_then(NativeValue::as_list).is_some());
        // 对象中的 null 成员被丢弃
        assert!(!status.contains_key("cloud"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let response = parse_response("{}").unwrap();
        assert!(!response.isok);
        assert!(response.data.is_empty());
        assert!(!response.is_online());

        let response = parse_response(r#"{"isok": "yes", "data": null}"#).unwrap();
        assert!(!response.isok);
        assert!(response.data.is_empty());
    }

    #[test]
    fn test_non_object_data_is_wrapped() {
        let response = parse_response(r#"{"isok": false, "data": [1, 2]}"#).unwrap();
        assert_eq!(
            response.data.get("array"),
            Some(&NativeValue::List(vec![NativeValue::Integer(1), NativeValue::Integer(2)]))
        );

        let response = parse_response(r#"{"isok": false, "data": "offline"}"#).unwrap();
        assert_eq!(response.data.get("value"), Some(&NativeValue::from("offline")));
    }

    #[test]
    fn test_invalid_responses() {
        assert!(matches!(
            parse_response("<html>502</html>"),
            Err(JsonError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_response("[true]"),
            Err(JsonError::UnsupportedType(_))
        ));
    }
}
