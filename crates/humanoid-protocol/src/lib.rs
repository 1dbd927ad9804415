//! # Humanoid Protocol
//!
//! 人形机器人通信协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `joints`: 关节顺序表（状态与命令共用）
//! - `types`: IMU / 状态 / 命令 / 手柄数据记录
//! - `diagnostic`: 诊断值与诊断等级
//! - `wire`: UDP 报文编解码
//! - `robot_kind`: 机器人型号元数据
//!
//! ## 字节序
//!
//! 报文统一使用小端字节序（Little Endian）。

pub mod diagnostic;
pub mod joints;
pub mod robot_kind;
pub mod types;
pub mod wire;

pub use diagnostic::*;
pub use joints::*;
pub use robot_kind::RobotKind;
pub use types::*;
pub use wire::{
    HEADER_LEN, MAGIC, MAX_DATAGRAM_SIZE, Message, MessageHeader, MessageType, PROTOCOL_VERSION,
    decode_message, encode_message,
};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Datagram too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("Bad magic: {0:02X?}")]
    BadMagic([u8; 2]),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    #[error("Payload length mismatch: header declares {declared}, datagram carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Trailing bytes after payload: {0}")]
    TrailingBytes(usize),

    #[error("Invalid UTF-8 in field {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Array length mismatch for {field}: expected {expected}, got {actual}")]
    ArrayLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::TooShort {
            needed: 12,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Datagram too short: need 12 bytes, got 3");

        let err = ProtocolError::UnknownMessageType(0x42);
        assert_eq!(err.to_string(), "Unknown message type: 0x42");

        let err = ProtocolError::ArrayLength {
            field: "q",
            expected: 31,
            actual: 30,
        };
        assert!(err.to_string().contains("expected 31, got 30"));
    }
}
