//! 性能指标模块
//!
//! 原子计数器，用于监控 IO 链路的健康状态。任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 驱动实时指标
///
/// ```rust
/// use humanoid_driver::HumanoidMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = HumanoidMetrics::new();
/// metrics.rx_messages_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_messages_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct HumanoidMetrics {
    /// RX 收到的数据报总数（含无法解码的）
    pub rx_messages_total: AtomicU64,

    /// RX 成功解码并处理的消息数
    pub rx_messages_valid: AtomicU64,

    /// RX 解码失败的数据报数
    pub rx_decode_errors: AtomicU64,

    /// RX 收到的非预期消息（上行类型、重复 Welcome、关节数不符的状态等）
    pub rx_unexpected: AtomicU64,

    /// RX 超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// TX 入队的消息总数（命令 + 可靠消息）
    pub tx_messages_total: AtomicU64,

    /// TX 成功发出的命令数
    pub tx_commands_sent: AtomicU64,

    /// 命令邮箱覆盖次数
    ///
    /// 快速增长说明发布频率高于 TX 线程的发送能力。
    pub tx_command_overwrites: AtomicU64,

    /// 可靠队列满导致的丢弃次数
    pub tx_reliable_drops: AtomicU64,

    /// TX 发出的心跳数
    pub heartbeats_sent: AtomicU64,

    /// 传输层错误次数（收发双方）
    pub transport_errors: AtomicU64,

    /// 回调 panic 次数
    pub callback_panics: AtomicU64,
}

impl HumanoidMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_messages_total: self.rx_messages_total.load(Ordering::Relaxed),
            rx_messages_valid: self.rx_messages_valid.load(Ordering::Relaxed),
            rx_decode_errors: self.rx_decode_errors.load(Ordering::Relaxed),
            rx_unexpected: self.rx_unexpected.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_messages_total: self.tx_messages_total.load(Ordering::Relaxed),
            tx_commands_sent: self.tx_commands_sent.load(Ordering::Relaxed),
            tx_command_overwrites: self.tx_command_overwrites.load(Ordering::Relaxed),
            tx_reliable_drops: self.tx_reliable_drops.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.rx_messages_total,
            &self.rx_messages_valid,
            &self.rx_decode_errors,
            &self.rx_unexpected,
            &self.rx_timeouts,
            &self.tx_messages_total,
            &self.tx_commands_sent,
            &self.tx_command_overwrites,
            &self.tx_reliable_drops,
            &self.heartbeats_sent,
            &self.transport_errors,
            &self.callback_panics,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_messages_total: u64,
    pub rx_messages_valid: u64,
    pub rx_decode_errors: u64,
    pub rx_unexpected: u64,
    pub rx_timeouts: u64,
    pub tx_messages_total: u64,
    pub tx_commands_sent: u64,
    pub tx_command_overwrites: u64,
    pub tx_reliable_drops: u64,
    pub heartbeats_sent: u64,
    pub transport_errors: u64,
    pub callback_panics: u64,
}

impl MetricsSnapshot {
    /// 解码失败率（百分比，0.0 ~ 100.0）
    pub fn decode_error_rate(&self) -> f64 {
        if self.rx_messages_total == 0 {
            return 0.0;
        }
        (self.rx_decode_errors as f64 / self.rx_messages_total as f64) * 100.0
    }

    /// 命令覆盖率（百分比，0.0 ~ 100.0）
    pub fn overwrite_rate(&self) -> f64 {
        if self.tx_messages_total == 0 {
            return 0.0;
        }
        (self.tx_command_overwrites as f64 / self.tx_messages_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = HumanoidMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.decode_error_rate(), 0.0);
        assert_eq!(snapshot.overwrite_rate(), 0.0);
    }

    #[test]
    fn test_metrics_rates() {
        let metrics = HumanoidMetrics::new();
        metrics.rx_messages_total.fetch_add(200, Ordering::Relaxed);
        metrics.rx_decode_errors.fetch_add(50, Ordering::Relaxed);
        metrics.tx_messages_total.fetch_add(10, Ordering::Relaxed);
        metrics.tx_command_overwrites.fetch_add(3, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert!((snapshot.decode_error_rate() - 25.0).abs() < 1e-9);
        assert!((snapshot.overwrite_rate() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = HumanoidMetrics::new();
        metrics.heartbeats_sent.fetch_add(7, Ordering::Relaxed);
        metrics.callback_panics.fetch_add(1, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(HumanoidMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.rx_messages_valid.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().rx_messages_valid, 4000);
    }
}
