//! 订阅者注册与分发
//!
//! 每种上报数据（IMU、关节状态、手柄、诊断）对应一个 [`Topic`]，
//! 回调按注册顺序在 RX 线程中被调用。
//!
//! # 回调约束
//!
//! 回调运行在 RX 线程，必须尽快返回；耗时处理请使用
//! [`SubscriberRegistry::add_channel`] 把数据转移到其他线程。
//! 回调 panic 会被捕获并计数，不会终止 RX 线程。
//!
//! ```rust
//! use humanoid_driver::SubscriberRegistry;
//! use humanoid_protocol::ImuData;
//! use std::sync::Arc;
//!
//! let mut registry = SubscriberRegistry::new();
//! let id = registry.add::<ImuData>(Arc::new(|imu: &Arc<ImuData>| {
//!     let _ = imu.quat_norm();
//! }));
//! assert_eq!(registry.len(), 1);
//! assert!(registry.remove(id));
//! ```

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use humanoid_protocol::{DiagnosticValue, ImuData, RobotState, SensorJoy};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

/// 订阅回调
pub type Callback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

/// 订阅句柄（用于取消订阅）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// 上报数据主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ImuData,
    RobotState,
    SensorJoy,
    DiagnosticValue,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::ImuData,
        Topic::RobotState,
        Topic::SensorJoy,
        Topic::DiagnosticValue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::ImuData => "imu",
            Topic::RobotState => "state",
            Topic::SensorJoy => "joy",
            Topic::DiagnosticValue => "diag",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    /// 接受短名（`imu`/`state`/`joy`/`diag`）和长名（`imu_data`/`robot_state`/...）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imu" | "imu_data" => Ok(Topic::ImuData),
            "state" | "robot_state" => Ok(Topic::RobotState),
            "joy" | "sensor_joy" => Ok(Topic::SensorJoy),
            "diag" | "diagnostic" | "diagnostic_value" => Ok(Topic::DiagnosticValue),
            other => Err(format!(
                "unknown topic '{}', expected one of: imu, state, joy, diag",
                other
            )),
        }
    }
}

/// 单个主题的回调列表
pub struct TopicSubscribers<T> {
    entries: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Clone for TopicSubscribers<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for TopicSubscribers<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> TopicSubscribers<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// 按注册顺序调用全部回调，返回 panic 的回调数量
    fn dispatch(&self, topic: Topic, value: &Arc<T>) -> usize {
        let mut panics = 0;
        for (id, callback) in &self.entries {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                warn!("Subscriber {} on topic '{}' panicked", id, topic);
                panics += 1;
            }
        }
        panics
    }
}

/// 可订阅的数据类型
pub trait TopicRecord: Send + Sync + Sized + 'static {
    const TOPIC: Topic;
    fn subscribers(registry: &SubscriberRegistry) -> &TopicSubscribers<Self>;
    fn subscribers_mut(registry: &mut SubscriberRegistry) -> &mut TopicSubscribers<Self>;
}

macro_rules! impl_topic_record {
    ($ty:ty, $topic:expr, $field:ident) => {
        impl TopicRecord for $ty {
            const TOPIC: Topic = $topic;
            fn subscribers(registry: &SubscriberRegistry) -> &TopicSubscribers<Self> {
                &registry.$field
            }
            fn subscribers_mut(registry: &mut SubscriberRegistry) -> &mut TopicSubscribers<Self> {
                &mut registry.$field
            }
        }
    };
}

impl_topic_record!(ImuData, Topic::ImuData, imu_data);
impl_topic_record!(RobotState, Topic::RobotState, robot_state);
impl_topic_record!(SensorJoy, Topic::SensorJoy, sensor_joy);
impl_topic_record!(DiagnosticValue, Topic::DiagnosticValue, diagnostic_value);

/// 订阅者注册表
///
/// [`RobotContext`](crate::RobotContext) 以写时复制方式持有：修改时克隆整表
/// （回调是 `Arc`，克隆开销很小），RX 线程只读取快照。
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    next_id: u64,
    imu_data: TopicSubscribers<ImuData>,
    robot_state: TopicSubscribers<RobotState>,
    sensor_joy: TopicSubscribers<SensorJoy>,
    diagnostic_value: TopicSubscribers<DiagnosticValue>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册回调，返回订阅句柄
    pub fn add<T: TopicRecord>(&mut self, callback: Callback<T>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        T::subscribers_mut(self).entries.push((id, callback));
        id
    }

    /// 注册一个有界通道订阅者
    ///
    /// 队列满时丢弃新数据并计数，绝不阻塞 RX 线程。
    pub fn add_channel<T: TopicRecord>(&mut self, capacity: usize) -> ChannelSubscription<T> {
        let (tx, receiver) = bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let callback = channel_callback(tx, dropped.clone());
        let id = self.add::<T>(callback);
        ChannelSubscription {
            id,
            receiver,
            dropped,
        }
    }

    /// 取消订阅（任意主题），返回是否找到
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.imu_data.remove(id)
            || self.robot_state.remove(id)
            || self.sensor_joy.remove(id)
            || self.diagnostic_value.remove(id)
    }

    /// 分发一条数据，返回 panic 的回调数量
    pub fn dispatch<T: TopicRecord>(&self, value: &Arc<T>) -> usize {
        T::subscribers(self).dispatch(T::TOPIC, value)
    }

    pub fn count(&self, topic: Topic) -> usize {
        match topic {
            Topic::ImuData => self.imu_data.len(),
            Topic::RobotState => self.robot_state.len(),
            Topic::SensorJoy => self.sensor_joy.len(),
            Topic::DiagnosticValue => self.diagnostic_value.len(),
        }
    }

    pub fn len(&self) -> usize {
        Topic::ALL.iter().map(|t| self.count(*t)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn channel_callback<T: Send + Sync + 'static>(
    tx: Sender<Arc<T>>,
    dropped: Arc<AtomicU64>,
) -> Callback<T> {
    Arc::new(move |value: &Arc<T>| {
        if tx.try_send(value.clone()).is_err() {
            // 队列满或接收端已释放：丢弃新数据，保留旧数据
            let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total == 1 || total.is_multiple_of(1000) {
                warn!("Channel subscriber full, {} records dropped so far", total);
            }
        }
    })
}

/// 通道订阅
///
/// 持有接收端和丢弃计数。释放接收端后，订阅回调仍然存在但只会计数丢弃，
/// 需要调用 `unsubscribe(id)` 才能移除。
pub struct ChannelSubscription<T> {
    id: SubscriptionId,
    receiver: Receiver<Arc<T>>,
    dropped: Arc<AtomicU64>,
}

impl<T> ChannelSubscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<Arc<T>> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Option<Arc<T>> {
        self.receiver.try_recv().ok()
    }

    /// 等待下一条数据；超时或订阅被移除时返回 `None`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 因队列满而丢弃的数据条数
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriberRegistry::new();

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            registry.add::<RobotState>(Arc::new(move |_: &Arc<RobotState>| {
                order.lock().push(tag);
            }));
        }

        let panics = registry.dispatch(&Arc::new(RobotState::new(31)));
        assert_eq!(panics, 0);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let hits = Arc::new(AtomicU64::new(0));
        let mut registry = SubscriberRegistry::new();
        let h = hits.clone();
        registry.add::<ImuData>(Arc::new(move |_: &Arc<ImuData>| {
            h.fetch_add(1, Ordering::Relaxed);
        }));

        registry.dispatch(&Arc::new(SensorJoy::default()));
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        registry.dispatch(&Arc::new(ImuData::default()));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(registry.count(Topic::ImuData), 1);
        assert_eq!(registry.count(Topic::SensorJoy), 0);
    }

    #[test]
    fn test_remove() {
        let mut registry = SubscriberRegistry::new();
        let a = registry.add::<SensorJoy>(Arc::new(|_: &Arc<SensorJoy>| {}));
        let b = registry.add::<DiagnosticValue>(Arc::new(|_: &Arc<DiagnosticValue>| {}));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(b));
        assert!(!registry.remove(b));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_callback_does_not_stop_others() {
        let hits = Arc::new(AtomicU64::new(0));
        let mut registry = SubscriberRegistry::new();
        registry.add::<ImuData>(Arc::new(|imu: &Arc<ImuData>| {
            if imu.stamp_ns == 0 {
                panic!("boom");
            }
        }));
        let h = hits.clone();
        registry.add::<ImuData>(Arc::new(move |_: &Arc<ImuData>| {
            h.fetch_add(1, Ordering::Relaxed);
        }));

        assert_eq!(registry.dispatch(&Arc::new(ImuData::default())), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_channel_subscription_counts_drops() {
        let mut registry = SubscriberRegistry::new();
        let sub = registry.add_channel::<RobotState>(2);

        for stamp in 0..5 {
            let state = RobotState {
                stamp_ns: stamp,
                ..RobotState::new(1)
            };
            registry.dispatch(&Arc::new(state));
        }

        assert_eq!(sub.dropped_count(), 3);
        assert_eq!(sub.try_recv().map(|s| s.stamp_ns), Some(0));
        assert_eq!(sub.try_recv().map(|s| s.stamp_ns), Some(1));
        assert!(sub.try_recv().is_none());
        assert!(sub.recv_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_topic_parse() {
        assert_eq!("imu".parse::<Topic>(), Ok(Topic::ImuData));
        assert_eq!("Robot_State".parse::<Topic>(), Ok(Topic::RobotState));
        assert_eq!(" diag ".parse::<Topic>(), Ok(Topic::DiagnosticValue));
        assert!("lidar".parse::<Topic>().is_err());
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>(), Ok(topic));
        }
    }
}
