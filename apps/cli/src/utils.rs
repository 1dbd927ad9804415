//! 命令共用的连接与信号处理

use crate::commands::config::CliConfig;
use anyhow::{Context, Result};
use humanoid_sdk::transport::SIMULATOR_ADDRESS;
use humanoid_sdk::{Humanoid, RobotApi};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// 命令行参数优先，其次配置文件，最后仿真器地址
pub fn resolve_address(arg: Option<&str>, config: &CliConfig) -> String {
    arg.or(config.address.as_deref()).unwrap_or(SIMULATOR_ADDRESS).to_string()
}

/// 使用 CLI 配置连接机器人
pub fn connect(address: &str, config: &CliConfig) -> Result<Humanoid> {
    println!("⏳ 连接到机器人 {} ...", address);
    debug!("CLI robot config: {:?}", config.robot);
    let mut robot = Humanoid::with_config(config.robot.clone());
    robot.init(address).with_context(|| format!("连接 {} 失败", address))?;

    if let Some(info) = robot.robot_info() {
        println!("✅ 已连接: {} ({} motors)", info.robot_kind, info.motor_number);
        info!("Connected to {}: {:?}", address, info);
    }
    Ok(robot)
}

/// 安装 Ctrl+C 处理，返回运行标志
pub fn install_ctrlc() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        println!("\n收到退出信号，正在关闭...");
    })
    .context("设置 Ctrl+C 处理失败")?;

    Ok(running)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_address_precedence() {
        let mut config = CliConfig::default();
        assert_eq!(resolve_address(None, &config), "127.0.0.1");

        config.address = Some("10.192.1.2".to_string());
        assert_eq!(resolve_address(None, &config), "10.192.1.2");
        assert_eq!(resolve_address(Some("192.168.1.5:9000"), &config), "192.168.1.5:9000");
    }
}
