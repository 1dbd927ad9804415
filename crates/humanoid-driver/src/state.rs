//! 共享状态上下文
//!
//! RX 线程写入、任意线程读取的最新值存储：
//! - IMU / 关节状态 / 手柄：`ArcSwapOption`，无锁读取，尚未收到数据时为 `None`
//! - 诊断：按名称保存每一项的最新值（`RwLock<BTreeMap>`，更新频率低）
//! - 订阅者注册表（写时复制：RX 线程从快照分发，回调内可重入订阅）与连接监控

use crate::heartbeat::ConnectionMonitor;
use crate::subscriptions::{
    Callback, ChannelSubscription, SubscriberRegistry, SubscriptionId, TopicRecord,
};
use arc_swap::{ArcSwap, ArcSwapOption};
use humanoid_protocol::{DiagnosticValue, ImuData, RobotState, SensorJoy};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// 默认连接超时
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct RobotContext {
    /// 最新 IMU 数据
    pub imu_data: ArcSwapOption<ImuData>,
    /// 最新关节状态
    pub robot_state: ArcSwapOption<RobotState>,
    /// 最新手柄输入
    pub sensor_joy: ArcSwapOption<SensorJoy>,
    /// 各诊断项的最新值（按名称）
    pub diagnostics: RwLock<BTreeMap<String, Arc<DiagnosticValue>>>,
    /// 订阅者注册表快照
    pub subscribers: ArcSwap<SubscriberRegistry>,
    /// 串行化注册表的修改（读取不需要）
    subscribers_writer: Mutex<()>,
    pub connection_monitor: ConnectionMonitor,
}

impl RobotContext {
    /// ```
    /// use humanoid_driver::RobotContext;
    /// use std::time::Duration;
    ///
    /// let ctx = RobotContext::new(Duration::from_secs(1));
    /// assert!(ctx.latest_robot_state().is_none());
    /// ```
    pub fn new(connection_timeout: Duration) -> Self {
        Self {
            imu_data: ArcSwapOption::empty(),
            robot_state: ArcSwapOption::empty(),
            sensor_joy: ArcSwapOption::empty(),
            diagnostics: RwLock::new(BTreeMap::new()),
            subscribers: ArcSwap::from_pointee(SubscriberRegistry::new()),
            subscribers_writer: Mutex::new(()),
            connection_monitor: ConnectionMonitor::new(connection_timeout),
        }
    }

    pub fn latest_imu_data(&self) -> Option<Arc<ImuData>> {
        self.imu_data.load_full()
    }

    pub fn latest_robot_state(&self) -> Option<Arc<RobotState>> {
        self.robot_state.load_full()
    }

    pub fn latest_sensor_joy(&self) -> Option<Arc<SensorJoy>> {
        self.sensor_joy.load_full()
    }

    pub fn latest_diagnostic(&self, name: &str) -> Option<Arc<DiagnosticValue>> {
        self.diagnostics.read().get(name).cloned()
    }

    /// 全部诊断项的最新值（按名称排序）
    pub fn diagnostics(&self) -> Vec<Arc<DiagnosticValue>> {
        self.diagnostics.read().values().cloned().collect()
    }

    /// 清空最新值与诊断（订阅者与连接监控不变）
    pub fn clear_latest(&self) {
        self.imu_data.store(None);
        self.robot_state.store(None);
        self.sensor_joy.store(None);
        self.diagnostics.write().clear();
    }

    pub(crate) fn store_diagnostic(&self, value: Arc<DiagnosticValue>) {
        self.diagnostics.write().insert(value.name.clone(), value);
    }

    fn update_subscribers<R>(&self, f: impl FnOnce(&mut SubscriberRegistry) -> R) -> R {
        let _guard = self.subscribers_writer.lock();
        let mut registry = SubscriberRegistry::clone(&self.subscribers.load());
        let out = f(&mut registry);
        self.subscribers.store(Arc::new(registry));
        out
    }

    pub fn subscribe<T: TopicRecord>(&self, callback: Callback<T>) -> SubscriptionId {
        self.update_subscribers(|registry| registry.add(callback))
    }

    pub fn subscribe_channel<T: TopicRecord>(&self, capacity: usize) -> ChannelSubscription<T> {
        self.update_subscribers(|registry| registry.add_channel(capacity))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.update_subscribers(|registry| registry.remove(id))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load().len()
    }
}

impl Default for RobotContext {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_protocol::DiagnosticLevel;

    #[test]
    fn test_context_starts_empty() {
        let ctx = RobotContext::default();
        assert!(ctx.latest_imu_data().is_none());
        assert!(ctx.latest_sensor_joy().is_none());
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(ctx.subscriber_count(), 0);
    }

    #[test]
    fn test_latest_value_replaced() {
        let ctx = RobotContext::default();
        let mut state = RobotState::new(31);
        state.stamp_ns = 1;
        ctx.robot_state.store(Some(Arc::new(state.clone())));
        state.stamp_ns = 2;
        ctx.robot_state.store(Some(Arc::new(state)));

        assert_eq!(ctx.latest_robot_state().map(|s| s.stamp_ns), Some(2));
    }

    #[test]
    fn test_diagnostics_keyed_by_name() {
        let ctx = RobotContext::default();
        ctx.store_diagnostic(Arc::new(DiagnosticValue::new(
            "imu",
            DiagnosticLevel::Ok,
            0,
            "IMU is functioning properly.",
        )));
        ctx.store_diagnostic(Arc::new(DiagnosticValue::new(
            "calibration",
            DiagnosticLevel::Warn,
            1,
            "Robot calibration in progress.",
        )));
        ctx.store_diagnostic(Arc::new(DiagnosticValue::new(
            "imu",
            DiagnosticLevel::Error,
            -1,
            "Error in IMU.",
        )));

        let all = ctx.diagnostics();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "calibration");
        assert_eq!(
            ctx.latest_diagnostic("imu").map(|d| d.level),
            Some(DiagnosticLevel::Error)
        );
        assert!(ctx.latest_diagnostic("ethercat").is_none());
    }

    #[test]
    fn test_clear_latest_keeps_subscribers() {
        let ctx = RobotContext::default();
        ctx.sensor_joy.store(Some(Arc::new(SensorJoy::default())));
        ctx.robot_state.store(Some(Arc::new(RobotState::new(31))));
        ctx.store_diagnostic(Arc::new(DiagnosticValue::new("imu", DiagnosticLevel::Ok, 0, "")));
        let _sub = ctx.subscribe_channel::<RobotState>(4);

        ctx.clear_latest();
        assert!(ctx.latest_sensor_joy().is_none());
        assert!(ctx.latest_robot_state().is_none());
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(ctx.subscriber_count(), 1);
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let ctx = RobotContext::default();
        let id = ctx.subscribe::<SensorJoy>(Arc::new(|_: &Arc<SensorJoy>| {}));
        let sub = ctx.subscribe_channel::<ImuData>(4);
        assert_eq!(ctx.subscriber_count(), 2);

        assert!(ctx.unsubscribe(id));
        assert!(ctx.unsubscribe(sub.id()));
        assert!(!ctx.unsubscribe(id));
    }

    #[test]
    fn test_snapshot_unaffected_by_later_subscribe() {
        let ctx = RobotContext::default();
        let snapshot = ctx.subscribers.load_full();
        ctx.subscribe::<ImuData>(Arc::new(|_: &Arc<ImuData>| {}));
        assert_eq!(snapshot.len(), 0);
        assert_eq!(ctx.subscriber_count(), 1);
    }
}
