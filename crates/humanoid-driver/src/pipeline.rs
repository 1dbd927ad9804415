//! Pipeline IO 循环模块
//!
//! - `rx_loop`：接收数据报、更新最新值、按注册顺序分发给订阅者
//! - `tx_loop`：命令邮箱（覆盖）优先，其次可靠队列（FIFO），空闲时定时发送心跳

use crate::heartbeat::HeartbeatSchedule;
use crate::metrics::HumanoidMetrics;
use crate::state::RobotContext;
use crate::subscriptions::TopicRecord;
use crossbeam_channel::Receiver;
use humanoid_protocol::{Message, RobotCmd};
use humanoid_transport::{RxTransport, TransportError, TxTransport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// 可靠队列容量
pub const RELIABLE_QUEUE_CAPACITY: usize = 16;

/// 命令邮箱（单槽，后写覆盖）
pub type CommandMailbox = Arc<Mutex<Option<RobotCmd>>>;

/// Pipeline 配置
///
/// ```
/// use humanoid_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     heartbeat_interval_ms: 100,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(config.receive_timeout_ms, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PipelineConfig {
    /// RX 接收超时（毫秒），也是 RX 线程检查退出标志的周期
    pub receive_timeout_ms: u64,
    /// 心跳间隔（毫秒），0 表示不发送心跳
    pub heartbeat_interval_ms: u64,
    /// 超过此时长未收到任何数据即视为断连（毫秒）
    pub connection_timeout_ms: u64,
    /// 关闭时等待 IO 线程退出的最长时间（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 10,
            heartbeat_interval_ms: 200,
            connection_timeout_ms: 1000,
            join_timeout_ms: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms.max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[cfg(feature = "realtime")]
fn raise_thread_priority(name: &str) {
    use thread_priority::*;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => tracing::info!("{} thread priority set to MAX (realtime)", name),
        Err(e) => warn!(
            "Failed to set {} thread priority: {}. \
            On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            name, e
        ),
    }
}

// ============================================================================
// RX
// ============================================================================

/// RX 线程主循环
///
/// 接收超时需在分离前设置到传输上（见 `HumanoidDriver::start`）。
/// 关节数组长度不等于 `motor_number` 的状态会被丢弃。
pub fn rx_loop(
    mut rx: impl RxTransport,
    ctx: Arc<RobotContext>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<HumanoidMetrics>,
    motor_number: usize,
) {
    #[cfg(feature = "realtime")]
    raise_thread_priority("RX");

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let message = match rx.receive() {
            Ok(message) => {
                metrics.rx_messages_total.fetch_add(1, Ordering::Relaxed);
                message
            },
            Err(TransportError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(TransportError::Protocol(e)) => {
                metrics.rx_messages_total.fetch_add(1, Ordering::Relaxed);
                metrics.rx_decode_errors.fetch_add(1, Ordering::Relaxed);
                debug!("RX thread: dropping undecodable datagram: {}", e);
                continue;
            },
            Err(e) => {
                metrics.transport_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal() {
                    error!("RX thread: fatal transport error: {}, setting is_running = false", e);
                    // Release: All writes before this are visible to threads that see the false value
                    is_running.store(false, Ordering::Release);
                    break;
                }
                // ICMP 端口不可达等：机器人可能尚未启动或正在重启
                debug!("RX thread: transient transport error: {}", e);
                // 某些错误会立即返回，避免空转
                spin_sleep::sleep(Duration::from_millis(1));
                continue;
            },
        };

        ctx.connection_monitor.register_feedback();
        handle_message(message, &ctx, &metrics, motor_number);
    }

    trace!("RX thread: loop exited");
}

/// 处理一条已解码的消息：更新最新值并分发
pub(crate) fn handle_message(
    message: Message,
    ctx: &RobotContext,
    metrics: &HumanoidMetrics,
    motor_number: usize,
) {
    match message {
        Message::ImuData(imu) => {
            let imu = Arc::new(imu);
            ctx.imu_data.store(Some(imu.clone()));
            deliver(ctx, metrics, &imu);
        },
        Message::RobotState(state) => {
            if let Err(e) = state.validate_len(motor_number) {
                debug!("RX thread: dropping RobotState: {}", e);
                metrics.rx_unexpected.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let state = Arc::new(state);
            ctx.robot_state.store(Some(state.clone()));
            deliver(ctx, metrics, &state);
        },
        Message::SensorJoy(joy) => {
            let joy = Arc::new(joy);
            ctx.sensor_joy.store(Some(joy.clone()));
            deliver(ctx, metrics, &joy);
        },
        Message::DiagnosticValue(diag) => {
            let diag = Arc::new(diag);
            let previous = ctx.latest_diagnostic(&diag.name);
            if previous.as_ref().is_none_or(|p| p.level != diag.level) {
                debug!("Diagnostic changed: {}", diag);
            }
            ctx.store_diagnostic(diag.clone());
            deliver(ctx, metrics, &diag);
        },
        Message::Welcome { .. } => {
            // 握手阶段重发的 Hello 可能换来多余的 Welcome
            trace!("RX thread: ignoring late Welcome");
            metrics.rx_unexpected.fetch_add(1, Ordering::Relaxed);
            return;
        },
        other => {
            debug!("RX thread: unexpected uplink message {:?}", other.message_type());
            metrics.rx_unexpected.fetch_add(1, Ordering::Relaxed);
            return;
        },
    }
    metrics.rx_messages_valid.fetch_add(1, Ordering::Relaxed);
}

fn deliver<T: TopicRecord>(ctx: &RobotContext, metrics: &HumanoidMetrics, value: &Arc<T>) {
    let subscribers = ctx.subscribers.load();
    let panics = subscribers.dispatch(value);
    if panics > 0 {
        metrics.callback_panics.fetch_add(panics as u64, Ordering::Relaxed);
    }
}

// ============================================================================
// TX
// ============================================================================

/// TX 线程主循环
///
/// 调度优先级：
/// 1. 命令邮箱（连续处理超过 `COMMAND_BURST_LIMIT` 次后让出一次给可靠队列）
/// 2. 可靠队列
/// 3. 到期的心跳
///
/// 退出前会清空可靠队列，因此关闭前入队的 Goodbye 仍会发出。
pub fn tx_loop(
    mut tx: impl TxTransport,
    mailbox: CommandMailbox,
    reliable_rx: Receiver<Message>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<HumanoidMetrics>,
    heartbeat_interval: Duration,
) {
    // 饿死保护：连续发送 N 条命令后，强制检查一次可靠队列
    const COMMAND_BURST_LIMIT: usize = 100;
    let mut command_burst_count = 0;
    let mut heartbeat = HeartbeatSchedule::new(heartbeat_interval);

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, flushing reliable queue");
            flush_reliable(&mut tx, &reliable_rx);
            break;
        }

        // Priority 1: 命令邮箱（取出后插槽变为 None）
        let command = mailbox.lock().take();
        if let Some(command) = command {
            match tx.send(&Message::RobotCmd(command)) {
                Ok(()) => {
                    metrics.tx_commands_sent.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    if handle_send_error(&e, "command", &is_running, &metrics) {
                        break;
                    }
                },
            }

            command_burst_count += 1;
            if command_burst_count < COMMAND_BURST_LIMIT {
                continue;
            }
            command_burst_count = 0;
        } else {
            command_burst_count = 0;
        }

        // Priority 2: 可靠队列
        if let Ok(message) = reliable_rx.try_recv() {
            if let Err(e) = tx.send(&message)
                && handle_send_error(&e, "reliable message", &is_running, &metrics)
            {
                break;
            }
            continue;
        }

        // Priority 3: 心跳
        if heartbeat.poll(Instant::now()) {
            match tx.send(&Message::Heartbeat) {
                Ok(()) => {
                    metrics.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    if handle_send_error(&e, "heartbeat", &is_running, &metrics) {
                        break;
                    }
                },
            }
            continue;
        }

        // 无数据，短暂休眠降低 CPU 占用（spin_sleep 提供微秒级精度）
        spin_sleep::sleep(Duration::from_micros(50));
    }

    trace!("TX thread: loop exited");
}

/// 记录发送错误，返回是否应退出循环
fn handle_send_error(
    e: &TransportError,
    what: &str,
    is_running: &AtomicBool,
    metrics: &HumanoidMetrics,
) -> bool {
    metrics.transport_errors.fetch_add(1, Ordering::Relaxed);
    if e.is_fatal() {
        error!("TX thread: fatal error sending {}: {}, setting is_running = false", what, e);
        // Release: All writes before this are visible to threads that see the false value
        is_running.store(false, Ordering::Release);
        return true;
    }
    warn!("TX thread: failed to send {}: {}", what, e);
    false
}

fn flush_reliable(tx: &mut impl TxTransport, reliable_rx: &Receiver<Message>) {
    while let Ok(message) = reliable_rx.try_recv() {
        if let Err(e) = tx.send(&message) {
            debug!("TX thread: dropping {:?} during shutdown: {}", message.message_type(), e);
            return;
        }
    }
}
