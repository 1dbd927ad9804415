//! 监控命令
//!
//! 订阅所选主题，按固定周期打印接收频率和最新值。不发送任何控制指令。

use crate::commands::config::CliConfig;
use crate::utils::{connect, install_ctrlc, resolve_address};
use anyhow::Result;
use clap::Args;
use humanoid_sdk::driver::Topic;
use humanoid_sdk::{ChannelSubscription, DiagnosticValue, Humanoid, ImuData, RobotState, SensorJoy};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

/// 每个主题的通道容量
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 机器人地址（覆盖配置）
    #[arg(short, long)]
    pub address: Option<String>,

    /// 监控时长（秒），不指定则直到 Ctrl+C
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// 主题（逗号分隔：imu,state,joy,diag），默认取配置或全部
    #[arg(short, long, value_delimiter = ',')]
    pub topics: Option<Vec<Topic>>,

    /// 打印周期（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
}

/// 打印周期内各主题的接收计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TopicCounts {
    imu: usize,
    state: usize,
    joy: usize,
    diag: usize,
}

/// 按主题持有的通道订阅（未选中的主题为 None）
struct Subscriptions {
    imu: Option<ChannelSubscription<ImuData>>,
    state: Option<ChannelSubscription<RobotState>>,
    joy: Option<ChannelSubscription<SensorJoy>>,
    diag: Option<ChannelSubscription<DiagnosticValue>>,
}

impl Subscriptions {
    fn new(robot: &Humanoid, topics: &[Topic]) -> Self {
        let wants = |t: Topic| topics.contains(&t);
        Self {
            imu: wants(Topic::ImuData).then(|| robot.subscribe_imu_data_channel(CHANNEL_CAPACITY)),
            state: wants(Topic::RobotState)
                .then(|| robot.subscribe_robot_state_channel(CHANNEL_CAPACITY)),
            joy: wants(Topic::SensorJoy)
                .then(|| robot.subscribe_sensor_joy_channel(CHANNEL_CAPACITY)),
            diag: wants(Topic::DiagnosticValue)
                .then(|| robot.subscribe_diagnostic_value_channel(CHANNEL_CAPACITY)),
        }
    }

    /// 取出已到达的数据并计数；非 OK 的诊断值立即打印
    fn drain(&self, counts: &mut TopicCounts) {
        if let Some(sub) = &self.imu {
            counts.imu += sub.receiver().try_iter().count();
        }
        if let Some(sub) = &self.state {
            counts.state += sub.receiver().try_iter().count();
        }
        if let Some(sub) = &self.joy {
            counts.joy += sub.receiver().try_iter().count();
        }
        if let Some(sub) = &self.diag {
            for diag in sub.receiver().try_iter() {
                counts.diag += 1;
                if !diag.is_ok() {
                    println!(
                        "⚠️  [{}] {} code={} {}",
                        diag.level.as_str(),
                        diag.name,
                        diag.code,
                        diag.message
                    );
                }
            }
        }
    }

    fn dropped(&self) -> u64 {
        self.imu.as_ref().map_or(0, |s| s.dropped_count())
            + self.state.as_ref().map_or(0, |s| s.dropped_count())
            + self.joy.as_ref().map_or(0, |s| s.dropped_count())
            + self.diag.as_ref().map_or(0, |s| s.dropped_count())
    }
}

impl MonitorCommand {
    /// 命令行优先，其次配置文件，都为空时监控全部主题
    fn selected_topics(&self, config: &CliConfig) -> Result<Vec<Topic>> {
        let topics = match &self.topics {
            Some(topics) => topics.clone(),
            None => config.default_topics()?,
        };
        if topics.is_empty() {
            Ok(Topic::ALL.to_vec())
        } else {
            Ok(topics)
        }
    }

    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let topics = self.selected_topics(config)?;
        let running = install_ctrlc()?;
        let address = resolve_address(self.address.as_deref(), config);

        let robot = connect(&address, config)?;
        let subs = Subscriptions::new(&robot, &topics);

        let names: Vec<&str> = topics.iter().map(|t| t.as_str()).collect();
        println!("📊 监控主题: {}", names.join(","));
        println!("按 Ctrl+C 停止\n");

        let interval = Duration::from_millis(self.interval_ms.max(100));
        let limit = self.duration.map(Duration::from_secs);
        let start = Instant::now();
        let mut window_start = Instant::now();
        let mut counts = TopicCounts::default();

        while running.load(Ordering::SeqCst) {
            if limit.is_some_and(|limit| start.elapsed() >= limit) {
                break;
            }

            subs.drain(&mut counts);

            let window = window_start.elapsed();
            if window >= interval {
                print_report(&robot, &topics, &counts, window);
                counts = TopicCounts::default();
                window_start = Instant::now();
            }

            thread::sleep(Duration::from_millis(10));
        }

        let metrics = robot.metrics();
        println!(
            "\n共接收 {} 条消息（解码失败 {}，回调异常 {}，通道丢弃 {}）",
            metrics.rx_messages_valid,
            metrics.rx_decode_errors,
            metrics.callback_panics,
            subs.dropped()
        );
        Ok(())
    }
}

fn rate(count: usize, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn print_report(robot: &Humanoid, topics: &[Topic], counts: &TopicCounts, window: Duration) {
    let link = if robot.is_connected() { "🟢" } else { "🔴" };
    println!("{} [{:.1}s]", link, window.as_secs_f64());

    for topic in topics {
        match topic {
            Topic::ImuData => {
                print!("  imu   {:>7.1} Hz", rate(counts.imu, window));
                if let Some(imu) = robot.latest_imu_data() {
                    print!("  quat={:.3?} gyro={:.3?}", imu.quat, imu.gyro);
                }
                println!();
            },
            Topic::RobotState => {
                print!("  state {:>7.1} Hz", rate(counts.state, window));
                if let Some(state) = robot.latest_robot_state() {
                    let head: Vec<f32> = state.q.iter().take(6).copied().collect();
                    print!("  q[0..6]={:.3?}", head);
                }
                println!();
            },
            Topic::SensorJoy => {
                print!("  joy   {:>7.1} Hz", rate(counts.joy, window));
                if let Some(joy) = robot.latest_sensor_joy() {
                    print!("  axes={:.2?} buttons={:?}", joy.axes, joy.buttons);
                }
                println!();
            },
            Topic::DiagnosticValue => {
                println!("  diag  {:>7.1} Hz", rate(counts.diag, window));
                for diag in robot.diagnostics() {
                    println!("        {:<12} {:<5} {}", diag.name, diag.level.as_str(), diag.message);
                }
            },
        }
    }
}
