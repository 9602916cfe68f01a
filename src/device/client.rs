//! Shelly Cloud HTTP客户端

use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// 默认请求超时时间
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// 设备API trait，定义状态拉取接口
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// 拉取设备状态
    ///
    /// # 参数
    /// * `device_id` - 设备ID
    ///
    /// # 返回
    /// * `Result<String, DeviceError>` - 接口返回的原始JSON文本
    async fn fetch_status(&self, device_id: &str) -> std::result::Result<String, DeviceError>;
}

/// Shelly Cloud 客户端
pub struct ShellyCloudClient {
    /// HTTP客户端
    client: Client,
    /// API基础URL
    base_url: String,
    /// 认证密钥
    auth_key: String,
}

impl std::fmt::Debug for ShellyCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellyCloudClient")
            .field("base_url", &self.base_url)
            .field("auth_key", &"***")
            .finish()
    }
}

impl ShellyCloudClient {
    /// 创建新的客户端
    ///
    /// # 参数
    /// * `base_url` - API基础URL
    /// * `auth_key` - 认证密钥
    /// * `timeout` - 请求超时时间
    pub fn new(
        base_url: impl Into<String>,
        auth_key: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_key: auth_key.into(),
        })
    }

    /// 从设备配置单元创建客户端
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        Ok(Self::new(config.base_url()?, config.auth_key()?, DEFAULT_TIMEOUT)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DeviceApi for ShellyCloudClient {
    async fn fetch_status(&self, device_id: &str) -> std::result::Result<String, DeviceError> {
        let url = format!("{}/device/status", self.base_url);
        debug!("拉取设备状态: {} (id={})", url, device_id);

        let response = self
            .client
            .get(&url)
            .query(&[("auth_key", self.auth_key.as_str()), ("id", device_id)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DeviceError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
