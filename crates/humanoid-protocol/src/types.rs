//! 数据记录定义
//!
//! 机器人上报的 IMU / 关节状态 / 手柄数据，以及下发的关节命令。
//! 所有按关节排列的数组均遵循 [`joints`](crate::joints) 中的顺序。

use crate::ProtocolError;
use crate::joints::HumanoidJoint;

/// IMU 数据
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuData {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 线加速度（m/s²）
    pub acc: [f32; 3],
    /// 角速度（rad/s）
    pub gyro: [f32; 3],
    /// 姿态四元数（w, x, y, z）
    pub quat: [f32; 4],
}

impl ImuData {
    /// 四元数模长（正常应接近 1.0）
    pub fn quat_norm(&self) -> f32 {
        self.quat.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// 关节状态
///
/// `tau` / `q` / `dq` 的长度等于电机数量。
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 关节力矩（N·m）
    pub tau: Vec<f32>,
    /// 关节位置（rad）
    pub q: Vec<f32>,
    /// 关节速度（rad/s）
    pub dq: Vec<f32>,
}

impl RobotState {
    pub fn new(motor_number: usize) -> Self {
        Self {
            stamp_ns: 0,
            tau: vec![0.0; motor_number],
            q: vec![0.0; motor_number],
            dq: vec![0.0; motor_number],
        }
    }

    pub fn motor_number(&self) -> usize {
        self.q.len()
    }

    /// `tau` / `q` / `dq` 的长度必须都等于 `motor_number`
    pub fn validate_len(&self, motor_number: usize) -> Result<(), ProtocolError> {
        let lengths = [
            ("tau", self.tau.len()),
            ("q", self.q.len()),
            ("dq", self.dq.len()),
        ];
        for (field, actual) in lengths {
            if actual != motor_number {
                return Err(ProtocolError::ArrayLength {
                    field,
                    expected: motor_number,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// 读取单个关节位置
    pub fn joint_position(&self, joint: HumanoidJoint) -> Option<f32> {
        self.q.get(joint.index()).copied()
    }

    /// 读取单个关节速度
    pub fn joint_velocity(&self, joint: HumanoidJoint) -> Option<f32> {
        self.dq.get(joint.index()).copied()
    }

    /// 读取单个关节力矩
    pub fn joint_torque(&self, joint: HumanoidJoint) -> Option<f32> {
        self.tau.get(joint.index()).copied()
    }
}

/// 关节命令
///
/// 每个关节的目标由 `q`/`dq`/`tau` 前馈与 `kp`/`kd` 增益组成：
/// `tau_out = kp * (q - q_now) + kd * (dq - dq_now) + tau`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotCmd {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 电机控制模式（0 = 默认）
    pub mode: Vec<u8>,
    /// 目标位置（rad）
    pub q: Vec<f32>,
    /// 目标速度（rad/s）
    pub dq: Vec<f32>,
    /// 前馈力矩（N·m）
    pub tau: Vec<f32>,
    /// 位置增益
    pub kp: Vec<f32>,
    /// 速度增益
    pub kd: Vec<f32>,
}

impl RobotCmd {
    /// 创建全零命令（零增益、零力矩，即不施加任何控制）
    pub fn new(motor_number: usize) -> Self {
        Self {
            stamp_ns: 0,
            mode: vec![0; motor_number],
            q: vec![0.0; motor_number],
            dq: vec![0.0; motor_number],
            tau: vec![0.0; motor_number],
            kp: vec![0.0; motor_number],
            kd: vec![0.0; motor_number],
        }
    }

    /// 以当前状态为目标的保持命令
    ///
    /// 目标位置取 `state.q`，目标速度和前馈力矩为 0，所有关节使用相同增益。
    pub fn hold(state: &RobotState, kp: f32, kd: f32) -> Self {
        let n = state.motor_number();
        Self {
            stamp_ns: state.stamp_ns,
            mode: vec![0; n],
            q: state.q.clone(),
            dq: vec![0.0; n],
            tau: vec![0.0; n],
            kp: vec![kp; n],
            kd: vec![kd; n],
        }
    }

    pub fn motor_number(&self) -> usize {
        self.q.len()
    }

    /// 设置单个关节的位置目标与增益
    ///
    /// 如果关节索引超出数组长度，返回 `false`。
    pub fn set_position(&mut self, joint: HumanoidJoint, q: f32, kp: f32, kd: f32) -> bool {
        let i = joint.index();
        if i >= self.q.len() || i >= self.kp.len() || i >= self.kd.len() {
            return false;
        }
        self.q[i] = q;
        self.kp[i] = kp;
        self.kd[i] = kd;
        true
    }

    /// 校验命令
    ///
    /// - 每个数组长度必须等于 `motor_number`
    /// - 所有浮点值必须是有限数
    pub fn validate(&self, motor_number: usize) -> Result<(), ProtocolError> {
        let lengths = [
            ("mode", self.mode.len()),
            ("q", self.q.len()),
            ("dq", self.dq.len()),
            ("tau", self.tau.len()),
            ("kp", self.kp.len()),
            ("kd", self.kd.len()),
        ];
        for (field, actual) in lengths {
            if actual != motor_number {
                return Err(ProtocolError::ArrayLength {
                    field,
                    expected: motor_number,
                    actual,
                });
            }
        }

        let arrays: [(&str, &[f32]); 5] = [
            ("q", self.q.as_slice()),
            ("dq", self.dq.as_slice()),
            ("tau", self.tau.as_slice()),
            ("kp", self.kp.as_slice()),
            ("kd", self.kd.as_slice()),
        ];
        for (field, values) in arrays {
            if let Some(i) = values.iter().position(|v| !v.is_finite()) {
                return Err(ProtocolError::InvalidValue {
                    field: format!("{}[{}]", field, i),
                    value: values[i].to_string(),
                });
            }
        }

        Ok(())
    }
}

/// 手柄输入
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorJoy {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 摇杆轴（-1.0 ~ 1.0）
    pub axes: Vec<f32>,
    /// 按键状态（0 = 松开，1 = 按下）
    pub buttons: Vec<i32>,
}

impl SensorJoy {
    /// 按键是否按下（越界视为未按下）
    pub fn is_pressed(&self, button: usize) -> bool {
        self.buttons.get(button).is_some_and(|&b| b != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::HUMANOID_MOTOR_NUMBER;

    #[test]
    fn test_new_cmd_is_valid() {
        let cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        assert_eq!(cmd.motor_number(), 31);
        assert!(cmd.validate(HUMANOID_MOTOR_NUMBER).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let mut cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        cmd.kd.pop();
        match cmd.validate(HUMANOID_MOTOR_NUMBER) {
            Err(ProtocolError::ArrayLength {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, "kd");
                assert_eq!(expected, 31);
                assert_eq!(actual, 30);
            },
            other => panic!("Expected ArrayLength, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        cmd.q[4] = f32::NAN;
        match cmd.validate(HUMANOID_MOTOR_NUMBER) {
            Err(ProtocolError::InvalidValue { field, .. }) => assert_eq!(field, "q[4]"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        let mut cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        cmd.tau[0] = f32::INFINITY;
        assert!(cmd.validate(HUMANOID_MOTOR_NUMBER).is_err());
    }

    #[test]
    fn test_hold_copies_state_positions() {
        let mut state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        state.stamp_ns = 42;
        state.q[HumanoidJoint::LeftKnee.index()] = 0.6;
        state.dq[HumanoidJoint::LeftKnee.index()] = 1.5;

        let cmd = RobotCmd::hold(&state, 80.0, 2.0);
        assert_eq!(cmd.stamp_ns, 42);
        assert_eq!(cmd.q[HumanoidJoint::LeftKnee.index()], 0.6);
        assert!(cmd.dq.iter().all(|v| *v == 0.0));
        assert!(cmd.kp.iter().all(|v| *v == 80.0));
        assert!(cmd.kd.iter().all(|v| *v == 2.0));
        assert!(cmd.validate(HUMANOID_MOTOR_NUMBER).is_ok());
    }

    #[test]
    fn test_set_position() {
        let mut cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        assert!(cmd.set_position(HumanoidJoint::HeadYaw, 0.3, 20.0, 0.5));
        let i = HumanoidJoint::HeadYaw.index();
        assert_eq!((cmd.q[i], cmd.kp[i], cmd.kd[i]), (0.3, 20.0, 0.5));

        let mut short = RobotCmd::new(6);
        assert!(!short.set_position(HumanoidJoint::HeadYaw, 0.3, 20.0, 0.5));
    }

    #[test]
    fn test_state_joint_accessors() {
        let mut state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        state.tau[HumanoidJoint::RightElbow.index()] = -3.0;
        assert_eq!(state.joint_torque(HumanoidJoint::RightElbow), Some(-3.0));
        assert_eq!(state.joint_position(HumanoidJoint::RightElbow), Some(0.0));
        assert_eq!(RobotState::new(2).joint_velocity(HumanoidJoint::RightElbow), None);
    }

    #[test]
    fn test_state_length_check() {
        let state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        assert!(state.validate_len(HUMANOID_MOTOR_NUMBER).is_ok());

        let mut state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        state.dq.pop();
        match state.validate_len(HUMANOID_MOTOR_NUMBER) {
            Err(ProtocolError::ArrayLength { field, actual, .. }) => {
                assert_eq!(field, "dq");
                assert_eq!(actual, 30);
            },
            other => panic!("Expected ArrayLength, got {:?}", other),
        }
        assert!(RobotState::new(4).validate_len(HUMANOID_MOTOR_NUMBER).is_err());
    }

    #[test]
    fn test_joy_buttons() {
        let joy = SensorJoy {
            stamp_ns: 0,
            axes: vec![0.0, 1.0],
            buttons: vec![0, 1],
        };
        assert!(!joy.is_pressed(0));
        assert!(joy.is_pressed(1));
        assert!(!joy.is_pressed(7));
    }

    #[test]
    fn test_imu_quat_norm() {
        let imu = ImuData {
            quat: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        assert!((imu.quat_norm() - 1.0).abs() < 1e-6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json_state() {
        let state = RobotState::new(2);
        let json = serde_json::to_string(&state).unwrap();
        let back: RobotState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
