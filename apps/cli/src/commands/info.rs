//! 机型与电机信息（无需连接）

use anyhow::Result;
use clap::Args;
use humanoid_sdk::transport::{DEFAULT_ROBOT_PORT, ROBOT_ADDRESS, SIMULATOR_ADDRESS};
use humanoid_sdk::{Humanoid, RobotApi};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct InfoCommand {
    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct InfoReport {
    robot_kind: String,
    motor_number: u32,
    simulator_address: &'static str,
    robot_address: &'static str,
    default_port: u16,
    motors: Vec<String>,
}

impl InfoReport {
    fn collect() -> Self {
        let robot = Humanoid::new();
        Self {
            robot_kind: robot.kind().to_string(),
            motor_number: robot.motor_number(),
            simulator_address: SIMULATOR_ADDRESS,
            robot_address: ROBOT_ADDRESS,
            default_port: DEFAULT_ROBOT_PORT,
            motors: robot.motor_names(),
        }
    }
}

impl InfoCommand {
    pub fn execute(&self) -> Result<()> {
        let report = InfoReport::collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("机型:       {}", report.robot_kind);
        println!("电机数量:   {}", report.motor_number);
        println!("仿真器地址: {}:{}", report.simulator_address, report.default_port);
        println!("实机地址:   {}:{}", report.robot_address, report.default_port);
        println!();
        println!("{:>5}  {}", "index", "joint");
        for (i, name) in report.motors.iter().enumerate() {
            println!("{:>5}  {}", i, name);
        }
        Ok(())
    }
}
