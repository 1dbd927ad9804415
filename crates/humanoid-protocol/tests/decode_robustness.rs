//! 解码器鲁棒性属性测试
//!
//! 使用 proptest 验证任意输入都不会导致解码 panic。

use humanoid_protocol::*;
use proptest::prelude::*;

fn valid_header(msg_type: u8, payload_len: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN);
    buf.extend_from_slice(&MAGIC);
    buf.push(PROTOCOL_VERSION);
    buf.push(msg_type);
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf
}

proptest! {
    /// 任意字节序列：只返回 Ok 或 Err，绝不 panic
    #[test]
    fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_message(&data);
    }

    /// 合法消息头 + 随机负载：负载解析路径同样不 panic
    #[test]
    fn valid_header_random_payload_never_panics(
        msg_type in prop::sample::select(vec![0x01u8, 0x02, 0x03, 0x10, 0x81, 0x90, 0x91, 0x92, 0x93]),
        payload in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut datagram = valid_header(msg_type, payload.len() as u32);
        datagram.extend_from_slice(&payload);
        let _ = decode_message(&datagram);
    }

    /// 截断任何合法的状态报文都必须报错
    #[test]
    fn truncated_state_is_rejected(cut in 1usize..50) {
        let mut state = RobotState::new(HUMANOID_MOTOR_NUMBER);
        state.q[0] = 0.5;
        let bytes = encode_message(&Message::RobotState(state), 3).unwrap();
        let cut = cut.min(bytes.len());
        prop_assert!(decode_message(&bytes[..bytes.len() - cut]).is_err());
    }

    /// 命令中的有限浮点值经过编解码后逐位保持不变
    #[test]
    fn command_values_survive_codec(q in proptest::collection::vec(-10.0f32..10.0, HUMANOID_MOTOR_NUMBER)) {
        let mut cmd = RobotCmd::new(HUMANOID_MOTOR_NUMBER);
        cmd.q = q;
        let bytes = encode_message(&Message::RobotCmd(cmd.clone()), 0).unwrap();
        let (_, decoded) = decode_message(&bytes).unwrap();
        prop_assert_eq!(decoded, Message::RobotCmd(cmd));
    }
}
