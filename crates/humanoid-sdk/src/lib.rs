//! Humanoid SDK - 人形机器人 Rust SDK
//!
//! 通过 UDP 与机器人（或仿真器）通信：电机元数据、IMU / 关节状态 / 手柄 / 诊断订阅、
//! 关节命令发布。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 数据记录、关节顺序表、报文编解码
//! - **传输层** (`transport`): UDP 与内存 Mock 传输
//! - **驱动层** (`driver`): 握手、IO 线程、最新值存储、订阅分发
//! - **SDK 层**: `RobotApi` trait 与 `Humanoid` 句柄
//!
//! # 快速开始
//!
//! ```no_run
//! use humanoid_sdk::prelude::*;
//!
//! let mut robot = Humanoid::new();
//! robot.subscribe_imu_data(|imu| println!("quat = {:?}", imu.quat));
//! robot.init("127.0.0.1")?;
//!
//! println!("{} motors: {:?}", robot.motor_number(), robot.motor_names());
//! # Ok::<(), RobotError>(())
//! ```

mod api;
pub mod config;
mod error;
mod humanoid;
pub mod logging;
pub mod prelude;

// 下层 crate 以模块路径重新导出（高级用户使用）
pub use humanoid_driver as driver;
pub use humanoid_protocol as protocol;
pub use humanoid_transport as transport;

pub use api::RobotApi;
pub use config::HumanoidConfig;
pub use error::{Result, RobotError};
pub use humanoid::Humanoid;
pub use logging::init_logging;

pub use humanoid_driver::{ChannelSubscription, MetricsSnapshot, RobotInfo, SubscriptionId};
pub use humanoid_protocol::{
    DiagnosticLevel, DiagnosticValue, HUMANOID_MOTOR_NUMBER, HumanoidJoint, ImuData, RobotCmd,
    RobotKind, RobotState, SensorJoy,
};
