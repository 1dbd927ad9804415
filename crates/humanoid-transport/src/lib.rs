//! # Humanoid Transport Layer
//!
//! 数据报传输抽象层，提供统一的收发接口。
//!
//! - [`UdpTransport`]: 连接真实机器人或仿真器
//! - [`MockTransport`]: 内存回环（`mock` feature），用于无网络测试

use humanoid_protocol::{Message, ProtocolError};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

pub mod udp;
pub use udp::{UdpRxTransport, UdpTransport, UdpTxTransport};

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRxTransport, MockTransport, MockTxTransport};

/// 机器人默认 UDP 端口
pub const DEFAULT_ROBOT_PORT: u16 = 43_897;

/// 仿真器默认地址
pub const SIMULATOR_ADDRESS: &str = "127.0.0.1";

/// 实机默认地址
pub const ROBOT_ADDRESS: &str = "10.192.1.2";

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Transport disconnected")]
    Disconnected,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// 是否为致命错误（IO 线程应停止）
    ///
    /// 单个坏报文、超时和 ICMP 端口不可达（对端尚未启动）都不是致命错误。
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Disconnected => true,
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

pub trait Transport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError>;
    fn receive(&mut self) -> Result<Message, TransportError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
    fn receive_timeout(&mut self, timeout: Duration) -> Result<Message, TransportError> {
        self.set_receive_timeout(timeout);
        self.receive()
    }
}

pub trait RxTransport {
    fn receive(&mut self) -> Result<Message, TransportError>;
}

pub trait TxTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError>;
}

/// 可分离为独立收发两半的传输
pub trait SplittableTransport: Transport {
    type Rx: RxTransport;
    type Tx: TxTransport;
    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError>;
}

/// 解析机器人地址
///
/// 支持以下形式：
/// - `"127.0.0.1"` / `"::1"`：使用 `default_port`
/// - `"10.192.1.2:43897"` / `"[::1]:43897"`：显式端口
/// - `"robot.local"` / `"robot.local:43897"`：主机名（DNS 解析，取第一个结果）
pub fn resolve_robot_address(
    address: &str,
    default_port: u16,
) -> Result<SocketAddr, TransportError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(TransportError::InvalidAddress("empty address".to_string()));
    }

    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let with_port = if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, default_port)
    };
    with_port
        .to_socket_addrs()
        .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", address, e)))?
        .next()
        .ok_or_else(|| TransportError::InvalidAddress(format!("{}: no address resolved", address)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bare_ip_uses_default_port() {
        let addr = resolve_robot_address("127.0.0.1", DEFAULT_ROBOT_PORT).unwrap();
        assert_eq!(addr, "127.0.0.1:43897".parse().unwrap());

        let addr = resolve_robot_address(" 10.192.1.2 ", 9000).unwrap();
        assert_eq!(addr, "10.192.1.2:9000".parse().unwrap());

        let addr = resolve_robot_address("::1", 9000).unwrap();
        assert_eq!(addr, "[::1]:9000".parse().unwrap());
    }

    #[test]
    fn test_resolve_explicit_port() {
        let addr = resolve_robot_address("127.0.0.1:5555", DEFAULT_ROBOT_PORT).unwrap();
        assert_eq!(addr.port(), 5555);
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(matches!(
            resolve_robot_address("", DEFAULT_ROBOT_PORT),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            resolve_robot_address("not an address:xyz", DEFAULT_ROBOT_PORT),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::Disconnected.is_fatal());
        assert!(!TransportError::Timeout.is_fatal());
        assert!(!TransportError::Protocol(ProtocolError::TrailingBytes(1)).is_fatal());
        assert!(
            !TransportError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
                .is_fatal()
        );
        assert!(TransportError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_fatal());
    }
}
