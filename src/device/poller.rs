//! 设备状态轮询

use crate::config::ConfigRegistry;
use crate::device::client::DeviceApi;
use crate::device::response::{parse_response, DeviceResponse};
use crate::error::{ConfigError, DeviceError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// 一次轮询得到的设备状态
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    /// 配置中的设备名称
    pub device_name: String,
    /// 设备ID
    pub device_id: String,
    /// 解析后的响应
    pub response: DeviceResponse,
    /// 拉取时间
    pub fetched_at: DateTime<Utc>,
}

/// 设备轮询器
pub struct DevicePoller {
    api: Arc<dyn DeviceApi>,
    registry: Arc<ConfigRegistry>,
}

impl DevicePoller {
    pub fn new(api: Arc<dyn DeviceApi>, registry: Arc<ConfigRegistry>) -> Self {
        Self { api, registry }
    }

    /// 拉取单个设备的状态
    ///
    /// # 参数
    /// * `device_name` - 设备配置单元 `devices` 映射中的名称
    ///
    /// # 返回
    /// * `Result<DeviceStatus>` - 设备未登记时返回 `DeviceError::UnknownDevice`
    pub async fn poll_once(&self, device_name: &str) -> Result<DeviceStatus> {
        let device_id = match self.registry.device()?.device_id(device_name) {
            Ok(id) => id,
            Err(ConfigError::PropertyNotFound { .. }) => {
                return Err(DeviceError::UnknownDevice {
                    name: device_name.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        let text = self.api.fetch_status(&device_id).await?;
        let response = parse_response(&text).map_err(DeviceError::from)?;

        if !response.isok {
            warn!("设备 {} ({}) 返回 isok=false", device_name, device_id);
        }
        info!(
            "设备 {} 状态已拉取，在线: {}",
            device_name,
            response.is_online()
        );

        Ok(DeviceStatus {
            device_name: device_name.to_string(),
            device_id,
            response,
            fetched_at: Utc::now(),
        })
    }

    /// 依次拉取所有已登记设备
    pub async fn poll_all(&self) -> Result<Vec<(String, Result<DeviceStatus>)>> {
        let names = self.registry.device()?.device_names()?;
        let mut results = Vec::with_capacity(names.len());

        for name in names {
            let status = self.poll_once(&name).await;
            if let Err(e) = &status {
                warn!("拉取设备 {} 状态失败: {}", name, e);
            }
            results.push((name, status));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;
    use crate::error::ShellyVitalsError;
    use crate::json::NativeValue;
    use crate::logging::NoOpRecorder;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// 返回预设响应的设备API
    struct FakeApi {
        responses: HashMap<String, String>,
    }

    #[async_trait]
    impl DeviceApi for FakeApi {
        async fn fetch_status(&self, device_id: &str) -> std::result::Result<String, DeviceError> {
            self.responses
                .get(device_id)
                .cloned()
                .ok_or(DeviceError::Status { status: 404 })
        }
    }

    fn setup(dir: &TempDir) -> DevicePoller {
        let paths = ConfigPaths::in_dir(dir.path());
        fs::write(
            &paths.general,
            r#"{"log":{"level":"info","file_path":"x.log","max_size":1,"retention_days":1},
                "update":{"interval":60,"retry_count":3,"retry_delay":5},
                "system":{"timezone":"UTC","locale":"en_US","date_format":"%Y"}}"#,
        )
        .unwrap();
        fs::write(
            &paths.database,
            r#"{"url":"u","username":"u","password":"p","driver":"d","pool":{"max_size":1,"timeout":1}}"#,
        )
        .unwrap();
        fs::write(
            &paths.device,
            r#"{"auth_key":"k","base_url":"https://shelly-example.cloud","devices":{"kitchen":"abc123","garage":"gone"}}"#,
        )
        .unwrap();

        let registry = ConfigRegistry::new(paths, Arc::new(NoOpRecorder)).unwrap();
        registry.initialize().unwrap();

        let api = FakeApi {
            responses: HashMap::from([(
                "abc123".to_string(),
                r#"{"isok":true,"data":{"online":true,"device_status":{"power":7}}}"#.to_string(),
            )]),
        };
        DevicePoller::new(Arc::new(api), Arc::new(registry))
    }

    #[tokio::test]
    async fn test_poll_once_resolves_device_id() {
        let dir = TempDir::new().unwrap();
        let poller = setup(&dir);

        let status = poller.poll_once("kitchen").await.unwrap();

        assert_eq!(status.device_id, "abc123");
        assert!(status.response.isok);
        assert!(status.response.is_online());
        assert_eq!(
            status.response.device_status().unwrap().get("power"),
            Some(&NativeValue::Integer(7))
        );
    }

    #[tokio::test]
    async fn test_poll_unknown_device() {
        let dir = TempDir::new().unwrap();
        let poller = setup(&dir);

        let err = poller.poll_once("attic").await.unwrap_err();

        assert!(matches!(
            err,
            ShellyVitalsError::Device(DeviceError::UnknownDevice { .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_all_collects_failures() {
        let dir = TempDir::new().unwrap();
        let poller = setup(&dir);

        let results = poller.poll_all().await.unwrap();

        assert_eq!(results.len(), 2);
        let (name, garage) = &results[0];
        assert_eq!(name, "garage");
        assert!(matches!(
            garage,
            Err(ShellyVitalsError::Device(DeviceError::Status { status: 404 }))
        ));
        assert!(results[1].1.is_ok());
    }
}
