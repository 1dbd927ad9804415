//! 人形机器人句柄
//!
//! `Humanoid` 由调用者持有，Drop 时向机器人发送 Goodbye 并停止 IO 线程。
//! 订阅可以在 `init` 之前注册，握手完成后到达的所有数据都会分发给它们。

use crate::api::RobotApi;
use crate::config::HumanoidConfig;
use crate::error::{Result, RobotError};
use humanoid_driver::{
    ChannelSubscription, DriverBuilder, DriverError, HumanoidDriver, MetricsSnapshot, RobotContext,
    RobotInfo, SubscriptionId, TopicRecord,
};
use humanoid_protocol::{DiagnosticValue, ImuData, RobotCmd, RobotKind, RobotState, SensorJoy};
use humanoid_transport::SplittableTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 人形机器人（31 自由度）
///
/// ```no_run
/// use humanoid_sdk::prelude::*;
/// use std::time::Duration;
///
/// let mut robot = Humanoid::new();
/// robot.init("10.192.1.2")?;
///
/// let state = robot.wait_for_robot_state(Duration::from_secs(1))?;
/// robot.publish_robot_cmd(&RobotCmd::hold(&state, 60.0, 3.0))?;
/// # Ok::<(), RobotError>(())
/// ```
pub struct Humanoid {
    kind: RobotKind,
    config: HumanoidConfig,
    /// 跨 init/shutdown 保留，订阅者不会丢失
    ctx: Arc<RobotContext>,
    driver: Option<HumanoidDriver>,
}

impl Humanoid {
    pub fn new() -> Self {
        Self::with_config(HumanoidConfig::default())
    }

    pub fn with_config(config: HumanoidConfig) -> Self {
        let ctx = Arc::new(RobotContext::new(config.pipeline.connection_timeout()));
        Self {
            kind: RobotKind::Humanoid,
            config,
            ctx,
            driver: None,
        }
    }

    pub fn config(&self) -> &HumanoidConfig {
        &self.config
    }

    pub fn kind(&self) -> RobotKind {
        self.kind
    }

    fn driver_builder(&self) -> DriverBuilder {
        DriverBuilder::new()
            .port(self.config.port)
            .client_name(self.config.client_name.clone())
            .handshake_timeout(self.config.handshake_timeout())
            .handshake_retry_interval(self.config.handshake_retry_interval())
            .expected_motor_number(self.kind.motor_number() as u32)
            .pipeline_config(self.config.pipeline.clone())
            .context(self.ctx.clone())
    }

    /// 在给定传输（例如 `MockTransport`）上完成握手并启动
    pub fn init_with_transport<T>(&mut self, transport: T) -> Result<()>
    where
        T: SplittableTransport + Send + 'static,
        T::Rx: Send + 'static,
        T::Tx: Send + 'static,
    {
        self.ensure_not_running()?;
        let driver = self.driver_builder().build_with_transport(transport)?;
        self.on_started(driver);
        Ok(())
    }

    /// IO 线程因致命传输错误退出后，旧会话被回收，允许重新 `init`
    fn ensure_not_running(&mut self) -> Result<()> {
        match self.driver.as_ref().map(|d| d.is_running()) {
            Some(true) => Err(RobotError::AlreadyInitialized),
            Some(false) => {
                warn!("Previous session stopped on a transport error, reinitializing");
                self.shutdown();
                Ok(())
            },
            None => Ok(()),
        }
    }

    fn on_started(&mut self, driver: HumanoidDriver) {
        info!(
            "Robot initialized: kind={}, motor_number={}",
            driver.robot_info().robot_kind,
            driver.robot_info().motor_number
        );
        self.driver = Some(driver);
    }

    fn driver(&self) -> Result<&HumanoidDriver> {
        self.driver.as_ref().ok_or(RobotError::NotInitialized)
    }

    // ========================================================================
    // 订阅
    // ========================================================================

    fn subscribe_topic<T, F>(&self, callback: F) -> SubscriptionId
    where
        T: TopicRecord,
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.ctx.subscribe::<T>(Arc::new(callback))
    }

    /// 以有界通道接收 IMU 数据（队列满时丢弃并计数）
    pub fn subscribe_imu_data_channel(&self, capacity: usize) -> ChannelSubscription<ImuData> {
        self.ctx.subscribe_channel(capacity)
    }

    pub fn subscribe_robot_state_channel(
        &self,
        capacity: usize,
    ) -> ChannelSubscription<RobotState> {
        self.ctx.subscribe_channel(capacity)
    }

    pub fn subscribe_sensor_joy_channel(&self, capacity: usize) -> ChannelSubscription<SensorJoy> {
        self.ctx.subscribe_channel(capacity)
    }

    pub fn subscribe_diagnostic_value_channel(
        &self,
        capacity: usize,
    ) -> ChannelSubscription<DiagnosticValue> {
        self.ctx.subscribe_channel(capacity)
    }

    /// 取消订阅（回调或通道），返回是否找到
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.ctx.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.ctx.subscriber_count()
    }

    // ========================================================================
    // 最新值
    // ========================================================================

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

    /// 所有子系统的最新诊断值（按名称排序）
    pub fn diagnostics(&self) -> Vec<Arc<DiagnosticValue>> {
        self.ctx.diagnostics()
    }

    /// 阻塞等待第一帧关节状态
    pub fn wait_for_robot_state(&self, timeout: Duration) -> Result<Arc<RobotState>> {
        Ok(self.driver()?.wait_for_robot_state(timeout)?)
    }

    // ========================================================================
    // 状态
    // ========================================================================

    pub fn is_initialized(&self) -> bool {
        self.driver.is_some()
    }

    /// 已初始化且连接超时窗口内收到过数据
    pub fn is_connected(&self) -> bool {
        self.driver.as_ref().is_some_and(|d| d.is_connected())
    }

    /// 握手时机器人上报的信息
    pub fn robot_info(&self) -> Option<&RobotInfo> {
        self.driver.as_ref().map(|d| d.robot_info())
    }

    /// 性能指标快照（未初始化时全为 0）
    pub fn metrics(&self) -> MetricsSnapshot {
        self.driver.as_ref().map(|d| d.metrics()).unwrap_or_default()
    }

    /// 停止 IO 线程；之后可以重新 `init`，已注册的订阅保留
    pub fn shutdown(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.shutdown();
            info!("Robot shut down");
        }
    }
}

impl Default for Humanoid {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotApi for Humanoid {
    /// # 错误
    /// - `RobotError::AlreadyInitialized`: 重复初始化（会话仍在运行）
    /// - `RobotError::Driver`: 地址无效、握手超时或电机数量不一致
    fn init(&mut self, address: &str) -> Result<()> {
        self.ensure_not_running()?;
        let driver = self.driver_builder().address(address).build()?;
        self.on_started(driver);
        Ok(())
    }

    fn motor_number(&self) -> u32 {
        self.kind.motor_number() as u32
    }

    fn motor_names(&self) -> Vec<String> {
        self.kind.motor_names().iter().map(|name| name.to_string()).collect()
    }

    fn subscribe_imu_data<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<ImuData>) + Send + Sync + 'static,
    {
        self.subscribe_topic::<ImuData, F>(callback)
    }

    fn subscribe_robot_state<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<RobotState>) + Send + Sync + 'static,
    {
        self.subscribe_topic::<RobotState, F>(callback)
    }

    fn subscribe_sensor_joy<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<SensorJoy>) + Send + Sync + 'static,
    {
        self.subscribe_topic::<SensorJoy, F>(callback)
    }

    fn subscribe_diagnostic_value<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<DiagnosticValue>) + Send + Sync + 'static,
    {
        self.subscribe_topic::<DiagnosticValue, F>(callback)
    }

    /// # 错误
    /// - `RobotError::NotInitialized`: 尚未 `init`
    /// - `RobotError::InvalidCommand`: 数组长度或数值不合法
    /// - `RobotError::Driver(DriverError::ChannelClosed)`: IO 线程已停止
    fn publish_robot_cmd(&self, cmd: &RobotCmd) -> Result<()> {
        self.driver()?.publish(cmd).map_err(|e| match e {
            DriverError::InvalidCommand(e) => RobotError::InvalidCommand(e),
            other => RobotError::Driver(other),
        })
    }
}

impl Drop for Humanoid {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_protocol::HUMANOID_MOTOR_NUMBER;

    #[test]
    fn test_static_metadata_without_init() {
        let robot = Humanoid::new();
        assert_eq!(robot.motor_number(), 31);

        let names = robot.motor_names();
        assert_eq!(names.len(), 31);
        assert_eq!(names[0], "left_hip_pitch_joint");
        assert_eq!(names[30], "right_hand_pitch_joint");
    }

    #[test]
    fn test_publish_before_init_fails() {
        let robot = Humanoid::new();
        let cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        assert!(matches!(
            robot.publish_robot_cmd(&cmd),
            Err(RobotError::NotInitialized)
        ));
        assert!(matches!(
            robot.wait_for_robot_state(Duration::from_millis(1)),
            Err(RobotError::NotInitialized)
        ));
    }

    #[test]
    fn test_subscribe_before_init() {
        let robot = Humanoid::new();
        let a = robot.subscribe_imu_data(|_| {});
        let b = robot.subscribe_diagnostic_value(|_| {});
        let _joy = robot.subscribe_sensor_joy_channel(8);
        assert_ne!(a, b);
        assert_eq!(robot.subscriber_count(), 3);

        assert!(robot.unsubscribe(a));
        assert!(!robot.unsubscribe(a));
        assert_eq!(robot.subscriber_count(), 2);
    }

    #[test]
    fn test_state_before_init() {
        let mut robot = Humanoid::new();
        assert!(!robot.is_initialized());
        assert!(!robot.is_connected());
        assert!(robot.robot_info().is_none());
        assert!(robot.latest_robot_state().is_none());
        assert!(robot.diagnostics().is_empty());
        assert_eq!(robot.metrics(), MetricsSnapshot::default());
        robot.shutdown();
    }

    #[test]
    fn test_with_config_keeps_config() {
        let config = HumanoidConfig {
            port: 9000,
            ..HumanoidConfig::default()
        };
        let robot = Humanoid::with_config(config.clone());
        assert_eq!(robot.config(), &config);
        assert_eq!(robot.kind(), RobotKind::Humanoid);
    }

    #[test]
    fn test_invalid_address() {
        let mut robot = Humanoid::new();
        let err = robot.init("").unwrap_err();
        assert!(matches!(err, RobotError::Driver(DriverError::Transport(_))));
        assert!(!robot.is_initialized());
    }
}
