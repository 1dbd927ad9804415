//! # Humanoid CLI
//!
//! Command-line interface for humanoid robots.
//!
//! ```bash
//! # 电机表（无需连接）
//! humanoid-cli info
//!
//! # 配置默认地址
//! humanoid-cli config set --address 10.192.1.2
//!
//! # 监控状态与诊断
//! humanoid-cli monitor --topics state,diag --duration 10
//!
//! # 保持当前姿态
//! humanoid-cli hold --kp 60 --kd 3 --rate 500
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::config::CliConfig;
use commands::{ConfigCommand, HoldCommand, InfoCommand, MonitorCommand};

/// Humanoid CLI - 人形机器人命令行工具
#[derive(Parser, Debug)]
#[command(name = "humanoid-cli")]
#[command(about = "Command-line interface for humanoid robots", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 显示机型和电机表
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },

    /// 监控机器人上报数据
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 以当前姿态为目标发布保持命令
    Hold {
        #[command(flatten)]
        args: HoldCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    humanoid_sdk::init_logging("humanoid_cli=info,humanoid_sdk=info,humanoid_driver=warn");

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { args } => args.execute(),
        Commands::Monitor { args } => args.execute(&CliConfig::load()?),
        Commands::Hold { args } => args.execute(&CliConfig::load()?),
        Commands::Config(cmd) => cmd.execute(),
    }
}
