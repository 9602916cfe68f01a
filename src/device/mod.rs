//! 设备API模块
//!
//! 从Shelly Cloud拉取设备状态并转换为原生值

pub mod client;
pub mod poller;
pub mod response;

// 重新导出主要类型
pub use client::{DeviceApi, ShellyCloudClient};
pub use poller::{DevicePoller, DeviceStatus};
pub use response::{parse_response, DeviceResponse};
