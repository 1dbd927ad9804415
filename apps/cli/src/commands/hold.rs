//! 保持当前姿态
//!
//! 读取当前关节位置，以 PD 位置命令按固定频率发布，直到超时或 Ctrl+C。

use crate::commands::config::CliConfig;
use crate::utils::{connect, install_ctrlc, resolve_address};
use anyhow::{Result, bail};
use clap::Args;
use humanoid_sdk::{RobotApi, RobotCmd};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct HoldCommand {
    /// 机器人地址（覆盖配置）
    #[arg(short, long)]
    pub address: Option<String>,

    /// 位置增益
    #[arg(long, default_value_t = 60.0)]
    pub kp: f32,

    /// 阻尼增益
    #[arg(long, default_value_t = 3.0)]
    pub kd: f32,

    /// 保持时长（秒），不指定则直到 Ctrl+C
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// 发布频率（Hz）
    #[arg(short, long, default_value_t = 500)]
    pub rate: u32,

    /// 等待首帧状态的超时（毫秒）
    #[arg(long, default_value_t = 2000)]
    pub state_timeout_ms: u64,
}

impl HoldCommand {
    fn validate(&self) -> Result<()> {
        if self.rate == 0 || self.rate > 2000 {
            bail!("发布频率必须在 1..=2000 Hz 之间，当前: {}", self.rate);
        }
        if !(self.kp.is_finite() && self.kp >= 0.0 && self.kd.is_finite() && self.kd >= 0.0) {
            bail!("增益必须为非负有限值: kp={}, kd={}", self.kp, self.kd);
        }
        Ok(())
    }

    fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.rate))
    }

    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        self.validate()?;
        let running = install_ctrlc()?;
        let address = resolve_address(self.address.as_deref(), config);
        let robot = connect(&address, config)?;

        let state = robot.wait_for_robot_state(Duration::from_millis(self.state_timeout_ms))?;
        let mut cmd = RobotCmd::hold(&state, self.kp, self.kd);
        println!(
            "🔒 保持当前姿态 (kp={}, kd={}, {} Hz)，按 Ctrl+C 停止",
            self.kp, self.kd, self.rate
        );

        let period = self.period();
        let limit = self.duration.map(Duration::from_secs);
        let start = Instant::now();
        let mut next = start;
        let mut published = 0u64;

        while running.load(Ordering::SeqCst) {
            if limit.is_some_and(|limit| start.elapsed() >= limit) {
                break;
            }

            cmd.stamp_ns = start.elapsed().as_nanos() as u64;
            robot.publish_robot_cmd(&cmd)?;
            published += 1;

            next += period;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // 落后超过一个周期时不补发
                debug!("Hold loop overran its period by {:?}", now - next);
                next = now;
            }
        }

        let metrics = robot.metrics();
        info!("Hold finished after {:?}: {:?}", start.elapsed(), metrics);
        println!(
            "✅ 已发布 {} 条命令（发送 {}，覆盖 {}）",
            published, metrics.tx_commands_sent, metrics.tx_command_overwrites
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(rate: u32, kp: f32) -> HoldCommand {
        HoldCommand {
            address: None,
            kp,
            kd: 3.0,
            duration: Some(1),
            rate,
            state_timeout_ms: 100,
        }
    }

    #[test]
    fn test_validate() {
        assert!(command(500, 60.0).validate().is_ok());
        assert!(command(0, 60.0).validate().is_err());
        assert!(command(5000, 60.0).validate().is_err());
        assert!(command(500, -1.0).validate().is_err());
        assert!(command(500, f32::NAN).validate().is_err());
    }

    #[test]
    fn test_period() {
        assert_eq!(command(500, 60.0).period(), Duration::from_millis(2));
        assert_eq!(command(1, 60.0).period(), Duration::from_secs(1));
    }
}
