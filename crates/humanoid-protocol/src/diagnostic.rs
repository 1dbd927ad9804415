//! 诊断值定义
//!
//! 机器人以 `(name, level, code, message)` 形式上报各子系统的健康状况：
//!
//! | name        | level | code | message                         |
//! |-------------|-------|------|---------------------------------|
//! | imu         | OK    | 0    | IMU is functioning properly.    |
//! | imu         | ERROR | -1   | Error in IMU.                   |
//! | ethercat    | OK    | 0    | EtherCAT is working fine.       |
//! | ethercat    | ERROR | -1   | EtherCAT error.                 |
//! | calibration | OK    | 0    | Robot calibration successful.   |
//! | calibration | WARN  | 1    | Robot calibration in progress.  |
//! | calibration | ERROR | -1   | Robot calibration failed.       |

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 诊断等级
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, IntoPrimitive, TryFromPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DiagnosticLevel {
    #[default]
    Ok = 0,
    Warn = 1,
    Error = 2,
    /// 数据过期（子系统长时间无上报）
    Stale = 3,
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticLevel::Ok => "OK",
            DiagnosticLevel::Warn => "WARN",
            DiagnosticLevel::Error => "ERROR",
            DiagnosticLevel::Stale => "STALE",
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 常用诊断码
pub mod codes {
    pub const OK: i32 = 0;
    pub const ERROR: i32 = -1;
    pub const CALIBRATION_IN_PROGRESS: i32 = 1;
}

/// 已知的诊断项名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownDiagnostic {
    Imu,
    EtherCat,
    Calibration,
}

impl KnownDiagnostic {
    pub const fn name(self) -> &'static str {
        match self {
            KnownDiagnostic::Imu => "imu",
            KnownDiagnostic::EtherCat => "ethercat",
            KnownDiagnostic::Calibration => "calibration",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "imu" => Some(KnownDiagnostic::Imu),
            "ethercat" => Some(KnownDiagnostic::EtherCat),
            "calibration" => Some(KnownDiagnostic::Calibration),
            _ => None,
        }
    }
}

/// 诊断值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticValue {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 诊断项名称
    pub name: String,
    pub level: DiagnosticLevel,
    /// 诊断码（0 正常，负数错误，正数进行中）
    pub code: i32,
    pub message: String,
}

impl DiagnosticValue {
    pub fn new(
        name: impl Into<String>,
        level: DiagnosticLevel,
        code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stamp_ns: 0,
            name: name.into(),
            level,
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.level == DiagnosticLevel::Ok
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    pub fn known(&self) -> Option<KnownDiagnostic> {
        KnownDiagnostic::from_name(&self.name)
    }
}

impl fmt::Display for DiagnosticValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] code={} {}",
            self.name, self.level, self.code, self.message
        )
    }
}
