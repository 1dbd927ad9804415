//! 关节顺序定义
//!
//! 人形机器人共 31 个关节。`RobotState` 与 `RobotCmd` 的每个数组元素都按照下表索引，
//! 两张表必须逐项一致。
//!
//! ```text
//!  0-5   左腿: hip_pitch, hip_roll, hip_yaw, knee, ankle_pitch, ankle_roll
//!  6-11  右腿: 同上
//! 12-14  腰部: yaw, roll, pitch
//! 15-16  头部: pitch, yaw
//! 17-23  左臂: shoulder_pitch, shoulder_roll, shoulder_yaw, elbow, hand_yaw, hand_roll, hand_pitch
//! 24-30  右臂: 同上
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 人形机器人电机数量
pub const HUMANOID_MOTOR_NUMBER: usize = 31;

/// 状态数据（`RobotState`）的关节顺序
pub const STATE_JOINT_ORDER: [&str; HUMANOID_MOTOR_NUMBER] = [
    "left_hip_pitch_joint",
    "left_hip_roll_joint",
    "left_hip_yaw_joint",
    "left_knee_joint",
    "left_ankle_pitch_joint",
    "left_ankle_roll_joint",
    "right_hip_pitch_joint",
    "right_hip_roll_joint",
    "right_hip_yaw_joint",
    "right_knee_joint",
    "right_ankle_pitch_joint",
    "right_ankle_roll_joint",
    "waist_yaw_joint",
    "waist_roll_joint",
    "waist_pitch_joint",
    "head_pitch_joint",
    "head_yaw_joint",
    "left_shoulder_pitch_joint",
    "left_shoulder_roll_joint",
    "left_shoulder_yaw_joint",
    "left_elbow_joint",
    "left_hand_yaw_joint",
    "left_hand_roll_joint",
    "left_hand_pitch_joint",
    "right_shoulder_pitch_joint",
    "right_shoulder_roll_joint",
    "right_shoulder_yaw_joint",
    "right_elbow_joint",
    "right_hand_yaw_joint",
    "right_hand_roll_joint",
    "right_hand_pitch_joint",
];

/// 命令数据（`RobotCmd`）的关节顺序
pub const COMMAND_JOINT_ORDER: [&str; HUMANOID_MOTOR_NUMBER] = [
    "left_hip_pitch_joint",
    "left_hip_roll_joint",
    "left_hip_yaw_joint",
    "left_knee_joint",
    "left_ankle_pitch_joint",
    "left_ankle_roll_joint",
    "right_hip_pitch_joint",
    "right_hip_roll_joint",
    "right_hip_yaw_joint",
    "right_knee_joint",
    "right_ankle_pitch_joint",
    "right_ankle_roll_joint",
    "waist_yaw_joint",
    "waist_roll_joint",
    "waist_pitch_joint",
    "head_pitch_joint",
    "head_yaw_joint",
    "left_shoulder_pitch_joint",
    "left_shoulder_roll_joint",
    "left_shoulder_yaw_joint",
    "left_elbow_joint",
    "left_hand_yaw_joint",
    "left_hand_roll_joint",
    "left_hand_pitch_joint",
    "right_shoulder_pitch_joint",
    "right_shoulder_roll_joint",
    "right_shoulder_yaw_joint",
    "right_elbow_joint",
    "right_hand_yaw_joint",
    "right_hand_roll_joint",
    "right_hand_pitch_joint",
];

/// 关节分组（用于显示和批量操作）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointGroup {
    LeftLeg,
    RightLeg,
    Waist,
    Head,
    LeftArm,
    RightArm,
}

impl JointGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            JointGroup::LeftLeg => "left_leg",
            JointGroup::RightLeg => "right_leg",
            JointGroup::Waist => "waist",
            JointGroup::Head => "head",
            JointGroup::LeftArm => "left_arm",
            JointGroup::RightArm => "right_arm",
        }
    }
}

impl fmt::Display for JointGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 人形机器人关节（判别值即数组索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum HumanoidJoint {
    LeftHipPitch = 0,
    LeftHipRoll = 1,
    LeftHipYaw = 2,
    LeftKnee = 3,
    LeftAnklePitch = 4,
    LeftAnkleRoll = 5,
    RightHipPitch = 6,
    RightHipRoll = 7,
    RightHipYaw = 8,
    RightKnee = 9,
    RightAnklePitch = 10,
    RightAnkleRoll = 11,
    WaistYaw = 12,
    WaistRoll = 13,
    WaistPitch = 14,
    HeadPitch = 15,
    HeadYaw = 16,
    LeftShoulderPitch = 17,
    LeftShoulderRoll = 18,
    LeftShoulderYaw = 19,
    LeftElbow = 20,
    LeftHandYaw = 21,
    LeftHandRoll = 22,
    LeftHandPitch = 23,
    RightShoulderPitch = 24,
    RightShoulderRoll = 25,
    RightShoulderYaw = 26,
    RightElbow = 27,
    RightHandYaw = 28,
    RightHandRoll = 29,
    RightHandPitch = 30,
}

impl HumanoidJoint {
    /// 按索引顺序排列的全部关节
    pub const ALL: [HumanoidJoint; HUMANOID_MOTOR_NUMBER] = [
        HumanoidJoint::LeftHipPitch,
        HumanoidJoint::LeftHipRoll,
        HumanoidJoint::LeftHipYaw,
        HumanoidJoint::LeftKnee,
        HumanoidJoint::LeftAnklePitch,
        HumanoidJoint::LeftAnkleRoll,
        HumanoidJoint::RightHipPitch,
        HumanoidJoint::RightHipRoll,
        HumanoidJoint::RightHipYaw,
        HumanoidJoint::RightKnee,
        HumanoidJoint::RightAnklePitch,
        HumanoidJoint::RightAnkleRoll,
        HumanoidJoint::WaistYaw,
        HumanoidJoint::WaistRoll,
        HumanoidJoint::WaistPitch,
        HumanoidJoint::HeadPitch,
        HumanoidJoint::HeadYaw,
        HumanoidJoint::LeftShoulderPitch,
        HumanoidJoint::LeftShoulderRoll,
        HumanoidJoint::LeftShoulderYaw,
        HumanoidJoint::LeftElbow,
        HumanoidJoint::LeftHandYaw,
        HumanoidJoint::LeftHandRoll,
        HumanoidJoint::LeftHandPitch,
        HumanoidJoint::RightShoulderPitch,
        HumanoidJoint::RightShoulderRoll,
        HumanoidJoint::RightShoulderYaw,
        HumanoidJoint::RightElbow,
        HumanoidJoint::RightHandYaw,
        HumanoidJoint::RightHandRoll,
        HumanoidJoint::RightHandPitch,
    ];

    /// 数组索引
    #[inline]
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }

    /// 关节名称（如 `left_knee_joint`）
    pub fn name(self) -> &'static str {
        STATE_JOINT_ORDER[self.index()]
    }

    /// 按索引查找
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(|i| Self::try_from(i).ok())
    }

    /// 按名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        STATE_JOINT_ORDER
            .iter()
            .position(|n| *n == name)
            .and_then(Self::from_index)
    }

    /// 所属分组
    pub fn group(self) -> JointGroup {
        match self.index() {
            0..=5 => JointGroup::LeftLeg,
            6..=11 => JointGroup::RightLeg,
            12..=14 => JointGroup::Waist,
            15..=16 => JointGroup::Head,
            17..=23 => JointGroup::LeftArm,
            _ => JointGroup::RightArm,
        }
    }
}

impl fmt::Display for HumanoidJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
