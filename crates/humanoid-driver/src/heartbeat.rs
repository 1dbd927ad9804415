//! Liveness tracking in both directions.
//!
//! - [`ConnectionMonitor`]: has the robot sent anything recently?
//! - [`HeartbeatSchedule`]: when should the TX thread tell the robot we are alive?
//!
//! Time is kept as microseconds relative to a process-wide monotonic anchor so it
//! fits in an `AtomicU64` and ignores wall-clock jumps.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static APP_START: OnceLock<Instant> = OnceLock::new();

fn get_monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Connection health monitor
///
/// Tracks the time since the last datagram was received from the robot.
/// A fresh monitor counts as alive: the handshake that precedes it is itself
/// proof of life.
pub struct ConnectionMonitor {
    last_feedback: AtomicU64,
    feedback_count: AtomicU64,
    timeout: Duration,
}

impl ConnectionMonitor {
    /// ```
    /// # use humanoid_driver::ConnectionMonitor;
    /// # use std::time::Duration;
    /// let monitor = ConnectionMonitor::new(Duration::from_secs(1));
    /// assert!(monitor.check_connection());
    /// ```
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_feedback: AtomicU64::new(get_monotonic_micros()),
            feedback_count: AtomicU64::new(0),
            timeout,
        }
    }

    /// True if feedback arrived within the timeout window
    pub fn check_connection(&self) -> bool {
        self.time_since_last_feedback() < self.timeout
    }

    /// Called by the RX thread for every datagram that decodes.
    pub fn register_feedback(&self) {
        self.last_feedback.store(get_monotonic_micros(), Ordering::Relaxed);
        self.feedback_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn time_since_last_feedback(&self) -> Duration {
        let last_us = self.last_feedback.load(Ordering::Relaxed);
        Duration::from_micros(get_monotonic_micros().saturating_sub(last_us))
    }

    /// Number of datagrams registered since creation
    pub fn feedback_count(&self) -> u64 {
        self.feedback_count.load(Ordering::Relaxed)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Fixed-rate heartbeat timer owned by the TX thread.
///
/// A zero interval disables heartbeats.
#[derive(Debug)]
pub struct HeartbeatSchedule {
    interval: Duration,
    next_due: Instant,
}

impl HeartbeatSchedule {
    /// The first heartbeat is due one interval after creation.
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_due: start + interval,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Returns true (and schedules the next beat) when a heartbeat is due at `now`.
    ///
    /// If the TX thread stalled for several intervals only one heartbeat is
    /// reported; the schedule restarts from `now` instead of bursting.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.is_enabled() || now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_time_always_increases() {
        let t1 = get_monotonic_micros();
        thread::sleep(Duration::from_millis(5));
        assert!(get_monotonic_micros() > t1);
    }

    #[test]
    fn test_connection_monitor_timeout_after_delay() {
        let monitor = ConnectionMonitor::new(Duration::from_millis(50));
        assert!(monitor.check_connection());
        thread::sleep(Duration::from_millis(100));
        assert!(!monitor.check_connection());

        monitor.register_feedback();
        assert!(monitor.check_connection());
        assert_eq!(monitor.feedback_count(), 1);
    }

    #[test]
    fn test_time_since_last_feedback() {
        let monitor = ConnectionMonitor::new(Duration::from_secs(1));
        thread::sleep(Duration::from_millis(20));
        assert!(monitor.time_since_last_feedback() >= Duration::from_millis(20));
        monitor.register_feedback();
        assert!(monitor.time_since_last_feedback() < Duration::from_millis(20));
    }

    #[test]
    fn test_heartbeat_schedule() {
        let start = Instant::now();
        let mut schedule = HeartbeatSchedule::starting_at(Duration::from_millis(100), start);

        assert!(!schedule.poll(start));
        assert!(schedule.poll(start + Duration::from_millis(100)));
        assert!(!schedule.poll(start + Duration::from_millis(150)));
        assert!(schedule.poll(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_heartbeat_schedule_no_burst_after_stall() {
        let start = Instant::now();
        let mut schedule = HeartbeatSchedule::starting_at(Duration::from_millis(10), start);

        let late = start + Duration::from_millis(1000);
        assert!(schedule.poll(late));
        assert!(!schedule.poll(late));
        assert!(!schedule.poll(late + Duration::from_millis(5)));
        assert!(schedule.poll(late + Duration::from_millis(10)));
    }

    #[test]
    fn test_heartbeat_schedule_disabled() {
        let mut schedule = HeartbeatSchedule::new(Duration::ZERO);
        assert!(!schedule.is_enabled());
        assert!(!schedule.poll(Instant::now() + Duration::from_secs(10)));
    }
}
