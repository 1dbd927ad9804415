//! 配置管理命令
//!
//! CLI 配置保存在用户配置目录下的 `humanoid/config.toml`：
//!
//! ```toml
//! address = "10.192.1.2"
//! topics = ["state", "diag"]
//!
//! [robot]
//! port = 43897
//! ```

use anyhow::{Context, Result};
use clap::Subcommand;
use humanoid_sdk::HumanoidConfig;
use humanoid_sdk::driver::Topic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("humanoid");
    Ok(path)
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认机器人地址（未设置时使用仿真器地址）
    pub address: Option<String>,

    /// `monitor` 默认监控的主题（空表示全部）
    pub topics: Vec<String>,

    /// SDK 参数
    pub robot: HumanoidConfig,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认值）
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("读取配置文件失败")?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, content).context("写入配置文件失败")?;
        Ok(())
    }

    /// 解析后的默认主题列表
    pub fn default_topics(&self) -> Result<Vec<Topic>> {
        self.topics
            .iter()
            .map(|t| t.parse::<Topic>().map_err(anyhow::Error::msg))
            .collect()
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置
    Show,

    /// 设置配置项
    Set {
        /// 默认机器人地址（`ip` 或 `ip:port`）
        #[arg(short, long)]
        address: Option<String>,

        /// 默认端口
        #[arg(short, long)]
        port: Option<u16>,

        /// `monitor` 默认主题（逗号分隔：imu,state,joy,diag）
        #[arg(short, long, value_delimiter = ',')]
        topics: Option<Vec<Topic>>,

        /// 心跳间隔（毫秒，0 表示关闭）
        #[arg(long)]
        heartbeat_ms: Option<u64>,
    },

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show(),
            ConfigCommand::Set {
                address,
                port,
                topics,
                heartbeat_ms,
            } => Self::set(address, port, topics, heartbeat_ms),
            ConfigCommand::Path => {
                println!("{}", config_file()?.display());
                Ok(())
            },
        }
    }

    fn show() -> Result<()> {
        let config = CliConfig::load()?;
        println!("# {}", config_file()?.display());
        print!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    fn set(
        address: Option<String>,
        port: Option<u16>,
        topics: Option<Vec<Topic>>,
        heartbeat_ms: Option<u64>,
    ) -> Result<()> {
        let mut config = CliConfig::load()?;
        apply_set(&mut config, address, port, topics, heartbeat_ms);
        config.save()?;
        println!("✅ 配置已保存: {}", config_file()?.display());
        Ok(())
    }
}

fn apply_set(
    config: &mut CliConfig,
    address: Option<String>,
    port: Option<u16>,
    topics: Option<Vec<Topic>>,
    heartbeat_ms: Option<u64>,
) {
    if let Some(address) = address {
        println!("✅ 默认地址: {}", address);
        config.address = Some(address);
    }
    if let Some(port) = port {
        println!("✅ 默认端口: {}", port);
        config.robot.port = port;
    }
    if let Some(topics) = topics {
        config.topics = topics.iter().map(|t| t.to_string()).collect();
        println!("✅ 默认主题: {}", config.topics.join(","));
    }
    if let Some(ms) = heartbeat_ms {
        println!("✅ 心跳间隔: {} ms", ms);
        config.robot.pipeline.heartbeat_interval_ms = ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        apply_set(
            &mut config,
            Some("10.192.1.2".to_string()),
            Some(9000),
            Some(vec![Topic::RobotState, Topic::DiagnosticValue]),
            Some(100),
        );
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.address.as_deref(), Some("10.192.1.2"));
        assert_eq!(loaded.robot.port, 9000);
        assert_eq!(loaded.robot.pipeline.heartbeat_interval_ms, 100);
        assert_eq!(
            loaded.default_topics().unwrap(),
            vec![Topic::RobotState, Topic::DiagnosticValue]
        );
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "address = \"127.0.0.1:5000\"\n").unwrap();

        let config = CliConfig::load_from(&path).unwrap();
        assert_eq!(config.address.as_deref(), Some("127.0.0.1:5000"));
        assert!(config.topics.is_empty());
        assert_eq!(config.robot, HumanoidConfig::default());
    }

    #[test]
    fn test_bad_topic_in_file() {
        let config = CliConfig {
            topics: vec!["lidar".to_string()],
            ..CliConfig::default()
        };
        assert!(config.default_topics().is_err());
    }
}
