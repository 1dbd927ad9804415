//! 真实 UDP 回环测试
//!
//! 测试线程绑定本地 socket 扮演机器人（仿真器）。

use humanoid_sdk::driver::DriverError;
use humanoid_sdk::prelude::*;
use humanoid_sdk::protocol::{HUMANOID_MOTOR_NUMBER, Message, decode_message, encode_message};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

struct FakeRobot {
    socket: UdpSocket,
    client: Option<SocketAddr>,
    seq: u32,
}

impl FakeRobot {
    fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        Self {
            socket,
            client: None,
            seq: 0,
        }
    }

    fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// 在 `timeout` 内接收第一条满足条件的消息
    fn recv_matching(
        &mut self,
        timeout: Duration,
        pred: impl Fn(&Message) -> bool,
    ) -> Option<Message> {
        let deadline = std::time::Instant::now() + timeout;
        let mut buf = [0u8; 4096];
        while std::time::Instant::now() < deadline {
            if let Ok((len, from)) = self.socket.recv_from(&mut buf) {
                self.client = Some(from);
                if let Ok((_, msg)) = decode_message(&buf[..len])
                    && pred(&msg)
                {
                    return Some(msg);
                }
            }
        }
        None
    }

    fn send(&mut self, message: &Message) {
        let client = self.client.expect("no client yet");
        let bytes = encode_message(message, self.seq).unwrap();
        self.seq += 1;
        self.socket.send_to(&bytes, client).unwrap();
    }

    /// 等待 Hello 并回复 Welcome
    fn accept(&mut self, motor_number: u32) {
        let hello = self.recv_matching(Duration::from_secs(2), |m| {
            matches!(m, Message::Hello { .. })
        });
        assert!(hello.is_some(), "no Hello received");
        self.send(&Message::Welcome {
            robot_kind: "humanoid".to_string(),
            motor_number,
        });
    }
}

fn config_for(port: u16) -> HumanoidConfig {
    let mut config = HumanoidConfig {
        port,
        handshake_timeout_ms: 500,
        handshake_retry_ms: 50,
        ..HumanoidConfig::default()
    };
    config.pipeline.heartbeat_interval_ms = 20;
    config
}

#[test]
fn test_udp_session() {
    let mut fake = FakeRobot::bind();
    let port = fake.port();

    let server = std::thread::spawn(move || {
        fake.accept(31);
        let mut state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        state.stamp_ns = 42;
        state.q[5] = -0.5;
        fake.send(&Message::RobotState(state));

        let cmd = fake.recv_matching(Duration::from_secs(2), |m| {
            matches!(m, Message::RobotCmd(_))
        });
        let heartbeat = fake.recv_matching(Duration::from_secs(1), |m| *m == Message::Heartbeat);
        (cmd, heartbeat.is_some())
    });

    let mut robot = Humanoid::with_config(config_for(port));
    robot.init("127.0.0.1").unwrap();

    let state = robot.wait_for_robot_state(Duration::from_secs(2)).unwrap();
    assert_eq!(state.stamp_ns, 42);
    robot.publish_robot_cmd(&RobotCmd::hold(&state, 40.0, 2.0)).unwrap();

    let (cmd, heartbeat_seen) = server.join().unwrap();
    match cmd {
        Some(Message::RobotCmd(cmd)) => {
            assert_eq!(cmd.q[5], -0.5);
            assert_eq!(cmd.kd[0], 2.0);
        },
        other => panic!("Expected RobotCmd, got {:?}", other),
    }
    assert!(heartbeat_seen);
    assert!(robot.is_connected());
}

#[test]
fn test_explicit_port_in_address() {
    let mut fake = FakeRobot::bind();
    let address = format!("127.0.0.1:{}", fake.port());

    let server = std::thread::spawn(move || fake.accept(31));

    // 配置端口与实际端口不同，地址中的端口优先
    let mut robot = Humanoid::with_config(config_for(1));
    robot.init(&address).unwrap();
    server.join().unwrap();
    assert!(robot.is_initialized());
}

#[test]
fn test_handshake_timeout_when_robot_silent() {
    let fake = FakeRobot::bind();
    let mut robot = Humanoid::with_config(config_for(fake.port()));

    let err = robot.init("127.0.0.1").unwrap_err();
    assert!(
        matches!(err, RobotError::Driver(DriverError::Handshake(_))),
        "{:?}",
        err
    );
    assert!(!robot.is_initialized());
}

#[test]
fn test_handshake_timeout_when_nothing_listens() {
    // 端口不可达（ICMP）不是致命错误，握手按超时失败
    let port = FakeRobot::bind().port();
    let mut robot = Humanoid::with_config(config_for(port));

    let err = robot.init("127.0.0.1").unwrap_err();
    assert!(
        matches!(err, RobotError::Driver(DriverError::Handshake(_))),
        "{:?}",
        err
    );
}

#[test]
fn test_motor_count_mismatch() {
    let mut fake = FakeRobot::bind();
    let port = fake.port();
    let server = std::thread::spawn(move || fake.accept(12));

    let mut robot = Humanoid::with_config(config_for(port));
    let err = robot.init("127.0.0.1").unwrap_err();
    server.join().unwrap();

    assert!(
        matches!(
            err,
            RobotError::Driver(DriverError::MotorCountMismatch {
                expected: 31,
                actual: 12
            })
        ),
        "{:?}",
        err
    );
}
