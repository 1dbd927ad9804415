//! Builder 模式实现
//!
//! 链式构造 `HumanoidDriver`：解析地址、建立 UDP 传输、握手、启动 IO 线程。

use crate::error::DriverError;
use crate::handshake::{HandshakeConfig, perform_handshake};
use crate::pipeline::PipelineConfig;
use crate::robot::HumanoidDriver;
use crate::state::RobotContext;
use humanoid_transport::{
    DEFAULT_ROBOT_PORT, SIMULATOR_ADDRESS, SplittableTransport, UdpTransport,
    resolve_robot_address,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Driver Builder（链式构造）
///
/// ```no_run
/// use humanoid_driver::{DriverBuilder, PipelineConfig};
///
/// // 连接本机仿真器
/// let driver = DriverBuilder::new().build().unwrap();
///
/// // 连接实机，自定义心跳
/// let driver = DriverBuilder::new()
///     .address("10.192.1.2")
///     .pipeline_config(PipelineConfig {
///         heartbeat_interval_ms: 100,
///         ..PipelineConfig::default()
///     })
///     .build()
///     .unwrap();
/// ```
pub struct DriverBuilder {
    /// 机器人地址（`ip` 或 `ip:port`），默认仿真器地址
    address: Option<String>,
    /// 地址未带端口时使用的端口
    port: u16,
    pipeline_config: Option<PipelineConfig>,
    handshake: HandshakeConfig,
    /// 预先创建的共享上下文（保留已注册的订阅者）
    context: Option<Arc<RobotContext>>,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self {
            address: None,
            port: DEFAULT_ROBOT_PORT,
            pipeline_config: None,
            handshake: HandshakeConfig::default(),
            context: None,
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.handshake.client_name = name.into();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake.timeout = timeout;
        self
    }

    pub fn handshake_retry_interval(mut self, interval: Duration) -> Self {
        self.handshake.retry_interval = interval;
        self
    }

    pub fn expected_motor_number(mut self, motor_number: u32) -> Self {
        self.handshake.expected_motor_number = motor_number;
        self
    }

    pub fn context(mut self, ctx: Arc<RobotContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// 通过 UDP 连接机器人
    ///
    /// # 错误
    /// - `DriverError::Transport`: 地址无效或 socket 创建失败
    /// - `DriverError::Handshake` / `DriverError::MotorCountMismatch`: 握手失败
    pub fn build(self) -> Result<HumanoidDriver, DriverError> {
        let address = self.address.as_deref().unwrap_or(SIMULATOR_ADDRESS);
        let peer = resolve_robot_address(address, self.port)?;
        info!("Connecting to robot at {}", peer);

        let transport = UdpTransport::connect(peer)?;
        self.build_with_transport(transport)
    }

    /// 使用给定传输（例如测试用的 `MockTransport`）完成握手并启动
    pub fn build_with_transport<T>(self, mut transport: T) -> Result<HumanoidDriver, DriverError>
    where
        T: SplittableTransport + Send + 'static,
        T::Rx: Send + 'static,
        T::Tx: Send + 'static,
    {
        let config = self.pipeline_config.unwrap_or_default();
        let ctx = self
            .context
            .unwrap_or_else(|| Arc::new(RobotContext::new(config.connection_timeout())));

        let info = perform_handshake(&mut transport, &self.handshake)?;
        HumanoidDriver::start(transport, ctx, info, &config)
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_transport::TransportError;

    #[test]
    fn test_builder_defaults() {
        let builder = DriverBuilder::new();
        assert!(builder.address.is_none());
        assert_eq!(builder.port, DEFAULT_ROBOT_PORT);
        assert_eq!(builder.handshake.expected_motor_number, 31);
    }

    #[test]
    fn test_builder_chain() {
        let builder = DriverBuilder::new()
            .address("10.192.1.2")
            .port(9000)
            .client_name("unit")
            .handshake_timeout(Duration::from_millis(50))
            .handshake_retry_interval(Duration::from_millis(10))
            .expected_motor_number(6);
        assert_eq!(builder.address.as_deref(), Some("10.192.1.2"));
        assert_eq!(builder.port, 9000);
        assert_eq!(builder.handshake.client_name, "unit");
        assert_eq!(builder.handshake.timeout, Duration::from_millis(50));
        assert_eq!(builder.handshake.expected_motor_number, 6);
    }

    #[test]
    fn test_build_rejects_invalid_address() {
        let result = DriverBuilder::new().address("").build();
        assert!(matches!(
            result,
            Err(DriverError::Transport(TransportError::InvalidAddress(_)))
        ));
    }
}
