//! 驱动层
//!
//! 负责与机器人之间的 IO 与状态同步：
//! - 会话握手（Hello / Welcome）
//! - 双线程 IO（RX 解码分发，TX 邮箱 + 可靠队列 + 心跳）
//! - 最新值存储（ArcSwap 无锁读取）
//! - 订阅者注册与回调分发
//! - 连接监控与性能指标
//!
//! 大多数用户应该使用 `humanoid-sdk` 提供的 `Humanoid` 句柄。

mod builder;
mod error;
pub mod handshake;
pub mod heartbeat;
pub mod metrics;
pub mod pipeline;
mod robot;
pub mod state;
pub mod subscriptions;

pub use builder::DriverBuilder;
pub use error::DriverError;
pub use handshake::{HandshakeConfig, RobotInfo, perform_handshake};
pub use heartbeat::{ConnectionMonitor, HeartbeatSchedule};
pub use metrics::{HumanoidMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, RELIABLE_QUEUE_CAPACITY, rx_loop, tx_loop};
pub use robot::HumanoidDriver;
pub use state::RobotContext;
pub use subscriptions::{
    Callback, ChannelSubscription, SubscriberRegistry, SubscriptionId, Topic, TopicRecord,
    TopicSubscribers,
};
