//! 会话握手
//!
//! 客户端发送 `Hello`，等待机器人回复 `Welcome`（携带机型和电机数量）。
//! 等待期间按固定间隔重发 `Hello`，丢弃其他消息。

use crate::error::DriverError;
use humanoid_protocol::{HUMANOID_MOTOR_NUMBER, Message, RobotKind};
use humanoid_transport::{Transport, TransportError};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// 握手参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// 写入 Hello 的客户端名称（机器人侧日志可见）
    pub client_name: String,
    /// 等待 Welcome 的总时长
    pub timeout: Duration,
    /// Hello 重发间隔
    pub retry_interval: Duration,
    /// 期望的电机数量（不一致则握手失败）
    pub expected_motor_number: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            client_name: format!("humanoid-sdk/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_millis(2000),
            retry_interval: Duration::from_millis(200),
            expected_motor_number: HUMANOID_MOTOR_NUMBER as u32,
        }
    }
}

/// 机器人在 Welcome 中上报的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotInfo {
    /// 机型名称（原样保存）
    pub robot_kind: String,
    pub motor_number: u32,
}

impl RobotInfo {
    /// 解析机型名称；未知机型返回 `None`
    pub fn kind(&self) -> Option<RobotKind> {
        RobotKind::from_name(&self.robot_kind)
    }
}

/// 执行握手
///
/// # 错误
/// - `DriverError::Handshake`: 超时未收到 Welcome
/// - `DriverError::MotorCountMismatch`: Welcome 中的电机数量与预期不符
/// - `DriverError::Transport`: 致命传输错误
pub fn perform_handshake<T: Transport>(
    transport: &mut T,
    config: &HandshakeConfig,
) -> Result<RobotInfo, DriverError> {
    let hello = Message::Hello {
        client_name: config.client_name.clone(),
    };
    let retry_interval = config.retry_interval.max(Duration::from_millis(1));
    let start = Instant::now();
    let deadline = start + config.timeout;

    send_hello(transport, &hello)?;
    let mut next_hello = start + retry_interval;
    let mut attempts = 1u32;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(DriverError::Handshake(format!(
                "no Welcome received within {:?} ({} Hello sent)",
                config.timeout, attempts
            )));
        }

        if now >= next_hello {
            trace!("Resending Hello (attempt {})", attempts + 1);
            send_hello(transport, &hello)?;
            attempts += 1;
            next_hello = now + retry_interval;
        }

        let wait = next_hello.min(deadline).saturating_duration_since(Instant::now());
        match transport.receive_timeout(wait.max(Duration::from_millis(1))) {
            Ok(Message::Welcome {
                robot_kind,
                motor_number,
            }) => {
                if motor_number != config.expected_motor_number {
                    return Err(DriverError::MotorCountMismatch {
                        expected: config.expected_motor_number,
                        actual: motor_number,
                    });
                }
                info!(
                    "Handshake complete: robot_kind={}, motor_number={}, elapsed={:?}",
                    robot_kind,
                    motor_number,
                    start.elapsed()
                );
                return Ok(RobotInfo {
                    robot_kind,
                    motor_number,
                });
            },
            Ok(other) => {
                trace!("Handshake: discarding {:?}", other.message_type());
            },
            Err(TransportError::Timeout) => {},
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                // 对端未监听（ICMP 不可达）或坏报文：继续等待直到超时
                debug!("Handshake: transient error: {}", e);
                std::thread::sleep(Duration::from_millis(5));
            },
        }
    }
}

/// 仅致命错误中止握手；ICMP 不可达会在下一次 send 上报告
fn send_hello<T: Transport>(transport: &mut T, hello: &Message) -> Result<(), DriverError> {
    match transport.send(hello) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            debug!("Handshake: Hello not sent: {}", e);
            Ok(())
        },
    }
}
