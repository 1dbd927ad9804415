//! UDP 传输
//!
//! 每个数据报承载一条完整消息。Socket 通过 `connect` 绑定对端地址，
//! 因此只会收到来自机器人的报文。

use crate::{RxTransport, SplittableTransport, Transport, TransportError, TxTransport};
use humanoid_protocol::{MAX_DATAGRAM_SIZE, Message, decode_message, encode_message};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::trace;

/// 默认接收超时
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(10);

pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    /// 发送序列号（分离后由 TX 半部继续使用）
    seq: Arc<AtomicU32>,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// 绑定临时本地端口并连接到机器人
    pub fn connect(peer: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self::bind(local, peer)
    }

    /// 绑定指定本地地址并连接到机器人
    pub fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)?;
        socket.connect(peer)?;
        socket.set_read_timeout(Some(DEFAULT_RECEIVE_TIMEOUT))?;

        Ok(Self {
            socket,
            peer,
            seq: Arc::new(AtomicU32::new(0)),
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

fn send_datagram(
    socket: &UdpSocket,
    seq: &AtomicU32,
    message: &Message,
) -> Result<(), TransportError> {
    let seq = seq.fetch_add(1, Ordering::Relaxed);
    let bytes = encode_message(message, seq)?;
    socket.send(&bytes)?;
    trace!("UDP sent {:?} seq={} len={}", message.message_type(), seq, bytes.len());
    Ok(())
}

fn recv_datagram(socket: &UdpSocket, buf: &mut [u8]) -> Result<Message, TransportError> {
    let len = match socket.recv(buf) {
        Ok(len) => len,
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            return Err(TransportError::Timeout);
        },
        Err(e) => return Err(TransportError::Io(e)),
    };
    let (header, message) = decode_message(&buf[..len])?;
    trace!("UDP received {:?} seq={} len={}", header.msg_type, header.seq, len);
    Ok(message)
}

fn apply_timeout(socket: &UdpSocket, timeout: Duration) {
    // 零超时对 set_read_timeout 是非法参数
    let timeout = timeout.max(Duration::from_micros(1));
    if let Err(e) = socket.set_read_timeout(Some(timeout)) {
        tracing::warn!("Failed to set UDP read timeout: {}", e);
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        send_datagram(&self.socket, &self.seq, message)
    }

    fn receive(&mut self) -> Result<Message, TransportError> {
        recv_datagram(&self.socket, &mut self.recv_buf)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        apply_timeout(&self.socket, timeout);
    }
}

/// UDP 接收半部
pub struct UdpRxTransport {
    socket: UdpSocket,
    recv_buf: Vec<u8>,
}

impl UdpRxTransport {
    pub fn set_receive_timeout(&mut self, timeout: Duration) {
        apply_timeout(&self.socket, timeout);
    }
}

impl RxTransport for UdpRxTransport {
    fn receive(&mut self) -> Result<Message, TransportError> {
        recv_datagram(&self.socket, &mut self.recv_buf)
    }
}

/// UDP 发送半部
pub struct UdpTxTransport {
    socket: UdpSocket,
    seq: Arc<AtomicU32>,
}

impl TxTransport for UdpTxTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        send_datagram(&self.socket, &self.seq, message)
    }
}

impl SplittableTransport for UdpTransport {
    type Rx = UdpRxTransport;
    type Tx = UdpTxTransport;

    /// 克隆底层 socket，收发各持一份；接收超时设置保留
    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        let tx_socket = self.socket.try_clone()?;
        Ok((
            UdpRxTransport {
                socket: self.socket,
                recv_buf: self.recv_buf,
            },
            UdpTxTransport {
                socket: tx_socket,
                seq: self.seq,
            },
        ))
    }
}
