//! 机器人通信接口
//!
//! 各机型实现同一 trait；当前实现为 [`Humanoid`](crate::Humanoid)。

use crate::error::Result;
use humanoid_driver::SubscriptionId;
use humanoid_protocol::{DiagnosticValue, ImuData, RobotCmd, RobotState, SensorJoy};
use std::sync::Arc;

/// 机器人通信接口
///
/// 回调在 SDK 的接收线程上按注册顺序同步调用，应尽快返回；
/// 耗时处理请改用 `subscribe_*_channel` 将数据转移到其他线程。
///
/// # Example
///
/// ```no_run
/// use humanoid_sdk::prelude::*;
///
/// let mut robot = Humanoid::new();
/// robot.subscribe_robot_state(|state| {
///     println!("q[0] = {}", state.q[0]);
/// });
/// robot.init("127.0.0.1")?;
///
/// let cmd = RobotCmd::new(robot.motor_number() as usize);
/// robot.publish_robot_cmd(&cmd)?;
/// # Ok::<(), RobotError>(())
/// ```
pub trait RobotApi {
    /// 与给定地址（`ip` 或 `ip:port`）上的机器人/仿真器建立会话
    fn init(&mut self, address: &str) -> Result<()>;

    /// 电机数量
    fn motor_number(&self) -> u32;

    /// 电机名称（按数组索引顺序），无元数据时为空
    fn motor_names(&self) -> Vec<String>;

    fn subscribe_imu_data<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<ImuData>) + Send + Sync + 'static;

    fn subscribe_robot_state<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<RobotState>) + Send + Sync + 'static;

    fn subscribe_sensor_joy<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<SensorJoy>) + Send + Sync + 'static;

    fn subscribe_diagnostic_value<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<DiagnosticValue>) + Send + Sync + 'static;

    /// 发布关节命令
    fn publish_robot_cmd(&self, cmd: &RobotCmd) -> Result<()>;
}
