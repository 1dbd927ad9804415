//! 机器人型号

use crate::joints::{HUMANOID_MOTOR_NUMBER, STATE_JOINT_ORDER};
use std::fmt;

/// 机器人型号
///
/// 每个型号对应一组固定的电机元数据。新型号作为并列变体加入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum RobotKind {
    /// 31 自由度人形机器人
    #[default]
    Humanoid,
}

impl RobotKind {
    /// 握手报文中使用的型号名称
    pub fn as_str(self) -> &'static str {
        match self {
            RobotKind::Humanoid => "humanoid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "humanoid" => Some(RobotKind::Humanoid),
            _ => None,
        }
    }

    /// 电机数量
    pub fn motor_number(self) -> usize {
        match self {
            RobotKind::Humanoid => HUMANOID_MOTOR_NUMBER,
        }
    }

    /// 电机名称（按数组索引顺序）
    pub fn motor_names(self) -> &'static [&'static str] {
        match self {
            RobotKind::Humanoid => &STATE_JOINT_ORDER,
        }
    }
}

impl fmt::Display for RobotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanoid_metadata() {
        let kind = RobotKind::Humanoid;
        assert_eq!(kind.motor_number(), 31);
        assert_eq!(kind.motor_names().len(), kind.motor_number());
        assert_eq!(RobotKind::from_name(kind.as_str()), Some(kind));
        assert_eq!(RobotKind::from_name("quadruped"), None);
    }
}
