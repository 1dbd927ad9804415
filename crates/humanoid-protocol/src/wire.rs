//! UDP 报文编解码
//!
//! 每个 UDP 数据报承载一条消息，格式为 12 字节消息头 + 负载：
//!
//! ```text
//! +-------+---------+----------+---------+-------------+
//! | magic | version | msg_type |   seq   | payload_len |
//! | "HM"  |   u8    |    u8    | u32 LE  |   u32 LE    |
//! +-------+---------+----------+---------+-------------+
//! ```
//!
//! 负载基本类型均为小端；数组为 `u16` 元素个数 + 元素，字符串为 `u16` 字节数 + UTF-8。

use crate::ProtocolError;
use crate::diagnostic::{DiagnosticLevel, DiagnosticValue};
use crate::types::{ImuData, RobotCmd, RobotState, SensorJoy};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 魔数
pub const MAGIC: [u8; 2] = *b"HM";
/// 协议版本
pub const PROTOCOL_VERSION: u8 = 1;
/// 消息头长度（字节）
pub const HEADER_LEN: usize = 12;
/// 单个数据报最大长度（字节）
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// 消息类型
///
/// 最高位为 1 表示机器人 → 客户端方向。
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum MessageType {
    // 客户端 → 机器人
    Hello = 0x01,
    Heartbeat = 0x02,
    Goodbye = 0x03,
    RobotCmd = 0x10,

    // 机器人 → 客户端
    Welcome = 0x81,
    ImuData = 0x90,
    RobotState = 0x91,
    SensorJoy = 0x92,
    DiagnosticValue = 0x93,
}

impl MessageType {
    /// 是否为机器人 → 客户端方向
    pub fn is_downlink(self) -> bool {
        u8::from(self) & 0x80 != 0
    }
}

/// 消息头（12 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub msg_type: MessageType,
    pub seq: u32,
    pub payload_len: u32,
}

impl MessageHeader {
    pub fn new(msg_type: MessageType, seq: u32, payload_len: u32) -> Self {
        Self {
            msg_type,
            seq,
            payload_len,
        }
    }

    /// 编码消息头
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.msg_type.into());
        buf.put_u32_le(self.seq);
        buf.put_u32_le(self.payload_len);
    }

    /// 从数据报开头解码消息头
    pub fn decode(datagram: &[u8]) -> Result<Self, ProtocolError> {
        if datagram.len() < HEADER_LEN {
            return Err(ProtocolError::TooShort {
                needed: HEADER_LEN,
                actual: datagram.len(),
            });
        }

        let mut buf = &datagram[..HEADER_LEN];
        let magic = [buf.get_u8(), buf.get_u8()];
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }

        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let raw_type = buf.get_u8();
        let msg_type =
            MessageType::try_from(raw_type).map_err(|_| ProtocolError::UnknownMessageType(raw_type))?;

        Ok(Self {
            msg_type,
            seq: buf.get_u32_le(),
            payload_len: buf.get_u32_le(),
        })
    }
}

/// 协议消息
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// 会话请求
    Hello { client_name: String },
    /// 客户端保活
    Heartbeat,
    /// 客户端断开
    Goodbye,
    /// 关节命令
    RobotCmd(RobotCmd),
    /// 会话确认（携带机器人元数据）
    Welcome {
        robot_kind: String,
        motor_number: u32,
    },
    ImuData(ImuData),
    RobotState(RobotState),
    SensorJoy(SensorJoy),
    DiagnosticValue(DiagnosticValue),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Hello { .. } => MessageType::Hello,
            Message::Heartbeat => MessageType::Heartbeat,
            Message::Goodbye => MessageType::Goodbye,
            Message::RobotCmd(_) => MessageType::RobotCmd,
            Message::Welcome { .. } => MessageType::Welcome,
            Message::ImuData(_) => MessageType::ImuData,
            Message::RobotState(_) => MessageType::RobotState,
            Message::SensorJoy(_) => MessageType::SensorJoy,
            Message::DiagnosticValue(_) => MessageType::DiagnosticValue,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn put_len(buf: &mut BytesMut, field: &'static str, len: usize) -> Result<(), ProtocolError> {
    let len = u16::try_from(len).map_err(|_| ProtocolError::InvalidValue {
        field: field.to_string(),
        value: format!("length {} exceeds u16", len),
    })?;
    buf.put_u16_le(len);
    Ok(())
}

fn put_f32_slice(
    buf: &mut BytesMut,
    field: &'static str,
    values: &[f32],
) -> Result<(), ProtocolError> {
    put_len(buf, field, values.len())?;
    for v in values {
        buf.put_f32_le(*v);
    }
    Ok(())
}

fn put_str(buf: &mut BytesMut, field: &'static str, s: &str) -> Result<(), ProtocolError> {
    put_len(buf, field, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// 编码消息为一个完整数据报
///
/// # 错误
/// - `ProtocolError::MessageTooLarge`: 编码结果超过 [`MAX_DATAGRAM_SIZE`]
/// - `ProtocolError::InvalidValue`: 数组或字符串长度超过 `u16`
pub fn encode_message(message: &Message, seq: u32) -> Result<Bytes, ProtocolError> {
    let mut payload = BytesMut::with_capacity(256);

    match message {
        Message::Hello { client_name } => put_str(&mut payload, "client_name", client_name)?,
        Message::Heartbeat | Message::Goodbye => {},
        Message::RobotCmd(cmd) => {
            payload.put_u64_le(cmd.stamp_ns);
            put_len(&mut payload, "mode", cmd.mode.len())?;
            payload.put_slice(&cmd.mode);
            put_f32_slice(&mut payload, "q", &cmd.q)?;
            put_f32_slice(&mut payload, "dq", &cmd.dq)?;
            put_f32_slice(&mut payload, "tau", &cmd.tau)?;
            put_f32_slice(&mut payload, "kp", &cmd.kp)?;
            put_f32_slice(&mut payload, "kd", &cmd.kd)?;
        },
        Message::Welcome {
            robot_kind,
            motor_number,
        } => {
            put_str(&mut payload, "robot_kind", robot_kind)?;
            payload.put_u32_le(*motor_number);
        },
        Message::ImuData(imu) => {
            payload.put_u64_le(imu.stamp_ns);
            for v in imu.acc.iter().chain(&imu.gyro).chain(&imu.quat) {
                payload.put_f32_le(*v);
            }
        },
        Message::RobotState(state) => {
            payload.put_u64_le(state.stamp_ns);
            put_f32_slice(&mut payload, "tau", &state.tau)?;
            put_f32_slice(&mut payload, "q", &state.q)?;
            put_f32_slice(&mut payload, "dq", &state.dq)?;
        },
        Message::SensorJoy(joy) => {
            payload.put_u64_le(joy.stamp_ns);
            put_f32_slice(&mut payload, "axes", &joy.axes)?;
            put_len(&mut payload, "buttons", joy.buttons.len())?;
            for b in &joy.buttons {
                payload.put_i32_le(*b);
            }
        },
        Message::DiagnosticValue(diag) => {
            payload.put_u64_le(diag.stamp_ns);
            put_str(&mut payload, "name", &diag.name)?;
            payload.put_u8(diag.level.into());
            payload.put_i32_le(diag.code);
            put_str(&mut payload, "message", &diag.message)?;
        },
    }

    let size = HEADER_LEN + payload.len();
    if size > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let mut out = BytesMut::with_capacity(size);
    MessageHeader::new(message.message_type(), seq, payload.len() as u32).encode(&mut out);
    out.extend_from_slice(&payload);
    Ok(out.freeze())
}

// ============================================================================
// Decoding
// ============================================================================

/// 负载读取器
///
/// 每次读取前检查剩余长度，`bytes::Buf` 在越界时会 panic。
struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::TooShort {
                needed,
                actual: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn u64(&mut self) -> Result<u64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    fn f32_array<const N: usize>(&mut self) -> Result<[f32; N], ProtocolError> {
        self.ensure(N * 4)?;
        let mut out = [0.0f32; N];
        for v in out.iter_mut() {
            *v = self.buf.get_f32_le();
        }
        Ok(out)
    }

    fn f32_vec(&mut self) -> Result<Vec<f32>, ProtocolError> {
        let n = self.u16()? as usize;
        self.ensure(n * 4)?;
        Ok((0..n).map(|_| self.buf.get_f32_le()).collect())
    }

    fn i32_vec(&mut self) -> Result<Vec<i32>, ProtocolError> {
        let n = self.u16()? as usize;
        self.ensure(n * 4)?;
        Ok((0..n).map(|_| self.buf.get_i32_le()).collect())
    }

    fn u8_vec(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let n = self.u16()? as usize;
        self.ensure(n)?;
        let out = self.buf[..n].to_vec();
        self.buf.advance(n);
        Ok(out)
    }

    fn string(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let n = self.u16()? as usize;
        self.ensure(n)?;
        let s = std::str::from_utf8(&self.buf[..n])
            .map_err(|_| ProtocolError::InvalidUtf8 { field })?
            .to_owned();
        self.buf.advance(n);
        Ok(s)
    }

    fn finish(self) -> Result<(), ProtocolError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes(self.buf.len()))
        }
    }
}

/// 解码一个完整数据报
///
/// 消息头中的 `payload_len` 必须与数据报实际负载长度一致，负载解析后不允许有剩余字节。
pub fn decode_message(datagram: &[u8]) -> Result<(MessageHeader, Message), ProtocolError> {
    let header = MessageHeader::decode(datagram)?;
    let payload = &datagram[HEADER_LEN..];
    if payload.len() != header.payload_len as usize {
        return Err(ProtocolError::LengthMismatch {
            declared: header.payload_len as usize,
            actual: payload.len(),
        });
    }

    let mut r = PayloadReader::new(payload);
    let message = match header.msg_type {
        MessageType::Hello => Message::Hello {
            client_name: r.string("client_name")?,
        },
        MessageType::Heartbeat => Message::Heartbeat,
        MessageType::Goodbye => Message::Goodbye,
        MessageType::RobotCmd => Message::RobotCmd(RobotCmd {
            stamp_ns: r.u64()?,
            mode: r.u8_vec()?,
            q: r.f32_vec()?,
            dq: r.f32_vec()?,
            tau: r.f32_vec()?,
            kp: r.f32_vec()?,
            kd: r.f32_vec()?,
        }),
        MessageType::Welcome => Message::Welcome {
            robot_kind: r.string("robot_kind")?,
            motor_number: r.u32()?,
        },
        MessageType::ImuData => Message::ImuData(ImuData {
            stamp_ns: r.u64()?,
            acc: r.f32_array()?,
            gyro: r.f32_array()?,
            quat: r.f32_array()?,
        }),
        MessageType::RobotState => Message::RobotState(RobotState {
            stamp_ns: r.u64()?,
            tau: r.f32_vec()?,
            q: r.f32_vec()?,
            dq: r.f32_vec()?,
        }),
        MessageType::SensorJoy => Message::SensorJoy(SensorJoy {
            stamp_ns: r.u64()?,
            axes: r.f32_vec()?,
            buttons: r.i32_vec()?,
        }),
        MessageType::DiagnosticValue => {
            let stamp_ns = r.u64()?;
            let name = r.string("name")?;
            let raw_level = r.u8()?;
            let level =
                DiagnosticLevel::try_from(raw_level).map_err(|_| ProtocolError::InvalidValue {
                    field: "level".to_string(),
                    value: raw_level.to_string(),
                })?;
            Message::DiagnosticValue(DiagnosticValue {
                stamp_ns,
                name,
                level,
                code: r.i32()?,
                message: r.string("message")?,
            })
        },
    };
    r.finish()?;

    Ok((header, message))
}
