//! 命令定义和实现

pub mod config;
pub mod hold;
pub mod info;
pub mod monitor;

pub use config::ConfigCommand;
pub use hold::HoldCommand;
pub use info::InfoCommand;
pub use monitor::MonitorCommand;
