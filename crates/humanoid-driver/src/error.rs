//! 驱动层错误类型定义

use humanoid_protocol::ProtocolError;
use humanoid_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 命令通道已关闭（IO 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 可靠队列已满
    #[error("Reliable queue full (capacity: {})", crate::pipeline::RELIABLE_QUEUE_CAPACITY)]
    ChannelFull,

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 握手失败（未收到 Welcome 等）
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// 机器人上报的电机数量与预期不符
    #[error("Motor count mismatch: expected {expected}, robot reports {actual}")]
    MotorCountMismatch { expected: u32, actual: u32 },

    /// 命令校验失败
    #[error("Invalid command: {0}")]
    InvalidCommand(ProtocolError),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}
