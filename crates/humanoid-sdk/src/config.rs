//! SDK 配置
//!
//! 支持从 TOML 字符串或文件加载，缺省字段使用默认值：
//!
//! ```toml
//! port = 43897
//! handshake_timeout_ms = 2000
//!
//! [pipeline]
//! heartbeat_interval_ms = 100
//! ```

use crate::error::{Result, RobotError};
use humanoid_driver::PipelineConfig;
use humanoid_transport::DEFAULT_ROBOT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanoidConfig {
    /// 地址未带端口时使用的端口
    pub port: u16,
    /// 握手时上报的客户端名称
    pub client_name: String,
    pub handshake_timeout_ms: u64,
    /// Hello 重发间隔
    pub handshake_retry_ms: u64,
    pub pipeline: PipelineConfig,
}

impl Default for HumanoidConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_ROBOT_PORT,
            client_name: format!("humanoid-sdk/{}", env!("CARGO_PKG_VERSION")),
            handshake_timeout_ms: 2000,
            handshake_retry_ms: 200,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl HumanoidConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| RobotError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RobotError::Config(e.to_string()))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn handshake_retry_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_retry_ms)
    }
}
