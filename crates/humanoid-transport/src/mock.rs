//! 内存回环传输（测试用）
//!
//! [`MockTransport::pair`] 创建一对相互连接的端点。报文以编码后的字节传递，
//! 因此编解码路径与 UDP 完全一致。

use crate::{RxTransport, SplittableTransport, Transport, TransportError, TxTransport};
use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use humanoid_protocol::{Message, decode_message, encode_message};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const DEFAULT_MOCK_TIMEOUT: Duration = Duration::from_millis(10);

pub struct MockTransport {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
    seq: Arc<AtomicU32>,
    timeout: Duration,
}

impl MockTransport {
    /// 创建一对互联端点：一端交给 SDK，另一端由测试扮演机器人
    pub fn pair() -> (MockTransport, MockTransport) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self::endpoint(a_tx, a_rx), Self::endpoint(b_tx, b_rx))
    }

    fn endpoint(tx: Sender<Bytes>, rx: Receiver<Bytes>) -> Self {
        Self {
            tx,
            rx,
            seq: Arc::new(AtomicU32::new(0)),
            timeout: DEFAULT_MOCK_TIMEOUT,
        }
    }

    /// 注入原始字节（用于测试坏报文）
    pub fn send_raw(&self, bytes: impl Into<Bytes>) -> Result<(), TransportError> {
        self.tx.send(bytes.into()).map_err(|_| TransportError::Disconnected)
    }

    /// 非阻塞取出当前已到达的全部消息（无法解码的报文被丢弃）
    pub fn drain(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(bytes) => {
                    if let Ok((_, msg)) = decode_message(&bytes) {
                        out.push(msg);
                    }
                },
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return out,
            }
        }
    }
}

fn send_encoded(tx: &Sender<Bytes>, seq: &AtomicU32, message: &Message) -> Result<(), TransportError> {
    let bytes = encode_message(message, seq.fetch_add(1, Ordering::Relaxed))?;
    tx.send(bytes).map_err(|_| TransportError::Disconnected)
}

fn recv_decoded(rx: &Receiver<Bytes>, timeout: Duration) -> Result<Message, TransportError> {
    match rx.recv_timeout(timeout) {
        Ok(bytes) => Ok(decode_message(&bytes)?.1),
        Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
        Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
    }
}

impl Transport for MockTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        send_encoded(&self.tx, &self.seq, message)
    }

    fn receive(&mut self) -> Result<Message, TransportError> {
        recv_decoded(&self.rx, self.timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

pub struct MockRxTransport {
    rx: Receiver<Bytes>,
    timeout: Duration,
}

impl RxTransport for MockRxTransport {
    fn receive(&mut self) -> Result<Message, TransportError> {
        recv_decoded(&self.rx, self.timeout)
    }
}

pub struct MockTxTransport {
    tx: Sender<Bytes>,
    seq: Arc<AtomicU32>,
}

impl TxTransport for MockTxTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        send_encoded(&self.tx, &self.seq, message)
    }
}

impl SplittableTransport for MockTransport {
    type Rx = MockRxTransport;
    type Tx = MockTxTransport;

    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        Ok((
            MockRxTransport {
                rx: self.rx,
                timeout: self.timeout,
            },
            MockTxTransport {
                tx: self.tx,
                seq: self.seq,
            },
        ))
    }
}
