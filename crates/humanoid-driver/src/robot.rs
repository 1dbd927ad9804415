//! 驱动主体
//!
//! `HumanoidDriver` 持有 RX/TX 两个 IO 线程，对外提供命令发布、
//! 最新值读取和健康检查。

use crate::error::DriverError;
use crate::handshake::RobotInfo;
use crate::metrics::{HumanoidMetrics, MetricsSnapshot};
use crate::pipeline::{CommandMailbox, PipelineConfig, RELIABLE_QUEUE_CAPACITY, rx_loop, tx_loop};
use crate::state::RobotContext;
use crossbeam_channel::{Sender, TrySendError};
use humanoid_protocol::{DiagnosticValue, ImuData, Message, RobotCmd, RobotState, SensorJoy};
use humanoid_transport::SplittableTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // Watchdog joins the target; if it outlives the timeout it is left detached
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 等待 IO 线程退出；panic 或超时记录 error 并返回 false
fn join_io_thread(handle: JoinHandle<()>, name: &str, timeout: Duration) -> bool {
    match handle.join_timeout(timeout) {
        Ok(()) => true,
        Err(_) => {
            error!("{} thread panicked or failed to shut down within {:?}", name, timeout);
            false
        },
    }
}

/// 人形机器人驱动
///
/// 由 [`DriverBuilder`](crate::DriverBuilder) 在握手成功后创建。
/// Drop 时发送 Goodbye 并停止 IO 线程。
pub struct HumanoidDriver {
    /// 命令邮箱（Overwrite）
    mailbox: CommandMailbox,
    /// 可靠队列发送端（FIFO）
    reliable_tx: Sender<Message>,
    ctx: Arc<RobotContext>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    metrics: Arc<HumanoidMetrics>,
    info: RobotInfo,
    join_timeout: Duration,
}

impl HumanoidDriver {
    /// 在已完成握手的传输上启动 IO 线程
    ///
    /// `ctx` 可以预先注册订阅者；握手之后到达的所有数据都会分发给它们。
    pub fn start<T>(
        mut transport: T,
        ctx: Arc<RobotContext>,
        info: RobotInfo,
        config: &PipelineConfig,
    ) -> Result<Self, DriverError>
    where
        T: SplittableTransport + Send + 'static,
        T::Rx: Send + 'static,
        T::Tx: Send + 'static,
    {
        transport.set_receive_timeout(config.receive_timeout());
        let (rx_transport, tx_transport) = transport.split()?;

        let mailbox: CommandMailbox = Arc::new(Mutex::new(None));
        let (reliable_tx, reliable_rx) = crossbeam_channel::bounded(RELIABLE_QUEUE_CAPACITY);
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(HumanoidMetrics::new());

        // 上一会话的数据不属于本会话；订阅者保留
        ctx.clear_latest();
        // 握手本身即是一次有效反馈
        ctx.connection_monitor.register_feedback();
        let motor_number = info.motor_number as usize;

        let rx_thread = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::Builder::new()
                .name("humanoid-rx".into())
                .spawn(move || rx_loop(rx_transport, ctx, is_running, metrics, motor_number))
                .map_err(|e| DriverError::IoThread(format!("failed to spawn RX thread: {}", e)))?
        };

        let tx_thread = {
            let mailbox = mailbox.clone();
            let is_running_tx = is_running.clone();
            let metrics = metrics.clone();
            let heartbeat_interval = config.heartbeat_interval();
            thread::Builder::new()
                .name("humanoid-tx".into())
                .spawn(move || {
                    tx_loop(
                        tx_transport,
                        mailbox,
                        reliable_rx,
                        is_running_tx,
                        metrics,
                        heartbeat_interval,
                    )
                })
        };
        let tx_thread = match tx_thread {
            Ok(handle) => handle,
            Err(e) => {
                is_running.store(false, Ordering::Release);
                join_io_thread(rx_thread, "RX", config.join_timeout());
                return Err(DriverError::IoThread(format!("failed to spawn TX thread: {}", e)));
            },
        };

        info!(
            "Driver started: robot_kind={}, motor_number={}",
            info.robot_kind, info.motor_number
        );

        Ok(Self {
            mailbox,
            reliable_tx,
            ctx,
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
            is_running,
            metrics,
            info,
            join_timeout: config.join_timeout(),
        })
    }

    pub fn robot_info(&self) -> &RobotInfo {
        &self.info
    }

    pub fn motor_number(&self) -> usize {
        self.info.motor_number as usize
    }

    pub fn context(&self) -> &Arc<RobotContext> {
        &self.ctx
    }

    /// 发布关节命令（邮箱模式，Last Write Wins）
    ///
    /// # 错误
    /// - `DriverError::InvalidCommand`: 数组长度或数值不合法
    /// - `DriverError::ChannelClosed`: IO 线程已停止
    pub fn publish(&self, cmd: &RobotCmd) -> Result<(), DriverError> {
        cmd.validate(self.motor_number()).map_err(DriverError::InvalidCommand)?;

        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::ChannelClosed);
        }

        let overwritten = self.mailbox.lock().replace(cmd.clone()).is_some();

        let total = self.metrics.tx_messages_total.fetch_add(1, Ordering::Relaxed) + 1;
        if overwritten {
            let overwrites =
                self.metrics.tx_command_overwrites.fetch_add(1, Ordering::Relaxed) + 1;

            // 每 1000 次发布检查一次覆盖率
            if total.is_multiple_of(1000) {
                let rate = (overwrites as f64 / total as f64) * 100.0;
                if rate > 50.0 {
                    warn!(
                        "High command overwrite rate: {:.1}% ({} overwrites / {} publishes). \
                         Commands are published faster than the TX thread can send them.",
                        rate, overwrites, total
                    );
                }
            }
        }

        Ok(())
    }

    /// 发送可靠消息（FIFO，不覆盖）
    ///
    /// # 错误
    /// - `DriverError::ChannelFull`: 队列满
    /// - `DriverError::ChannelClosed`: IO 线程已停止
    pub fn send_reliable(&self, message: Message) -> Result<(), DriverError> {
        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::ChannelClosed);
        }
        match self.reliable_tx.try_send(message) {
            Ok(()) => {
                self.metrics.tx_messages_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(TrySendError::Full(_)) => {
                self.metrics.tx_reliable_drops.fetch_add(1, Ordering::Relaxed);
                Err(DriverError::ChannelFull)
            },
            Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }

    pub fn latest_imu_data(&self) -> Option<Arc<ImuData>> {
        self.ctx.latest_imu_data()
    }

    pub fn latest_robot_state(&self) -> Option<Arc<RobotState>> {
        self.ctx.latest_robot_state()
    }

    pub fn latest_sensor_joy(&self) -> Option<Arc<SensorJoy>> {
        self.ctx.latest_sensor_joy()
    }

    pub fn latest_diagnostic(&self, name: &str) -> Option<Arc<DiagnosticValue>> {
        self.ctx.latest_diagnostic(name)
    }

    /// 等待收到关节状态（已有则立即返回）
    ///
    /// 用于控制循环开始前获取当前姿态，避免以全零状态计算命令。
    pub fn wait_for_robot_state(&self, timeout: Duration) -> Result<Arc<RobotState>, DriverError> {
        let start = Instant::now();
        loop {
            if let Some(state) = self.ctx.latest_robot_state() {
                return Ok(state);
            }
            if !self.is_running.load(Ordering::Acquire) {
                return Err(DriverError::ChannelClosed);
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// IO 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 返回 `(rx_alive, tx_alive)`
    pub fn check_health(&self) -> (bool, bool) {
        let rx_alive = self.rx_thread.as_ref().is_some_and(|h| !h.is_finished());
        let tx_alive = self.tx_thread.as_ref().is_some_and(|h| !h.is_finished());
        (rx_alive, tx_alive)
    }

    pub fn is_healthy(&self) -> bool {
        let (rx_alive, tx_alive) = self.check_health();
        rx_alive && tx_alive
    }

    /// 连接超时窗口内是否收到过机器人数据
    pub fn is_connected(&self) -> bool {
        self.is_running() && self.ctx.connection_monitor.check_connection()
    }

    pub fn connection_age(&self) -> Duration {
        self.ctx.connection_monitor.time_since_last_feedback()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 停止 IO 线程（幂等）
    ///
    /// 线程仍在运行时先入队 Goodbye，TX 线程退出前会将其发出。
    pub fn shutdown(&mut self) {
        if self.rx_thread.is_none() && self.tx_thread.is_none() {
            return;
        }

        if self.is_running.load(Ordering::Acquire)
            && self.reliable_tx.try_send(Message::Goodbye).is_err()
        {
            warn!("Reliable queue full, Goodbye not sent");
        }

        // Release: All writes before this are visible to threads that see the false value
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.rx_thread.take() {
            join_io_thread(handle, "RX", self.join_timeout);
        }
        if let Some(handle) = self.tx_thread.take() {
            join_io_thread(handle, "TX", self.join_timeout);
        }

        info!("Driver stopped");
    }
}

impl Drop for HumanoidDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
