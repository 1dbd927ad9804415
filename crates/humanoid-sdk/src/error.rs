//! SDK 错误类型

use humanoid_driver::DriverError;
use humanoid_protocol::ProtocolError;
use thiserror::Error;

/// SDK 层错误
#[derive(Error, Debug)]
pub enum RobotError {
    /// 尚未调用 `init`
    #[error("Robot not initialized, call init() first")]
    NotInitialized,

    #[error("Robot already initialized")]
    AlreadyInitialized,

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Config error: {0}")]
    Config(String),

    /// 命令数组长度或数值不合法
    #[error("Invalid command: {0}")]
    InvalidCommand(ProtocolError),
}

impl From<toml::de::Error> for RobotError {
    fn from(e: toml::de::Error) -> Self {
        RobotError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RobotError>;
