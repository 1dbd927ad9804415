//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use humanoid_sdk::prelude::*;
//! ```

pub use crate::api::RobotApi;
pub use crate::config::HumanoidConfig;
pub use crate::error::RobotError;
pub use crate::humanoid::Humanoid;

// 数据记录
pub use humanoid_protocol::{
    DiagnosticLevel, DiagnosticValue, HumanoidJoint, ImuData, RobotCmd, RobotState, SensorJoy,
};

pub use humanoid_driver::{ChannelSubscription, SubscriptionId};
