//! 数据包组帧与拆帧

use core::fmt::Write;

use heapless::{String, Vec};

use super::{
    command::Command,
    parity::{check_parity, decode_counter, decode_flags, decode_value, encode_counter, encode_value, Counter, FlagBits},
    Error, ReportType, CONFIRMATION_ERROR, CONFIRMATION_VALID,
};
use crate::config::{AIRSHIP_ADDRESS, CONTROLLER_ADDRESS};

/// NRF24L01 单个数据包的最大长度
pub const MAX_PACKET_LEN: usize = 32;
/// 报告头: 目的地址、源地址、状态字节、报告类型
pub const REPORT_HEADER_LEN: usize = 4;
/// 测量数据报告可用的载荷长度
pub const MEASURED_DATA_LEN: usize = MAX_PACKET_LEN - REPORT_HEADER_LEN;

/// 无线数据包
pub type Packet = Vec<u8, MAX_PACKET_LEN>;

fn push_all(packet: &mut Packet, bytes: &[u8]) -> Result<(), Error> {
    packet
        .extend_from_slice(bytes)
        .map_err(|_| Error::PayloadTooLong)
}

/// 遥控器 → 飞艇的命令数据包
///
/// 格式: `[飞艇地址, 遥控器地址, 计数字节, 命令ID, 带校验数值?]`
pub fn encode_command(cmd: &Command) -> Result<Packet, Error> {
    let mut packet = Packet::new();
    push_all(
        &mut packet,
        &[
            AIRSHIP_ADDRESS,
            CONTROLLER_ADDRESS,
            encode_counter(cmd.counter),
            cmd.id as u8,
        ],
    )?;

    if cmd.id.carries_value() {
        let mut digits: String<12> = String::new();
        write!(digits, "{}", encode_value(cmd.value)).map_err(|_| Error::PayloadTooLong)?;
        push_all(&mut packet, digits.as_bytes())?;
    }
    Ok(packet)
}

/// 拆开的命令数据包，尚未校验
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub destination: u8,
    pub source: u8,
    pub counter_byte: u8,
    pub id_byte: u8,
    /// 命令ID之后的全部字节
    pub value: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// 按字段拆分命令数据包
    pub fn split(bytes: &'a [u8]) -> Result<Self, Error> {
        match bytes {
            [destination, source, counter_byte, id_byte, value @ ..] => Ok(CommandFrame {
                destination: *destination,
                source: *source,
                counter_byte: *counter_byte,
                id_byte: *id_byte,
                value,
            }),
            _ => Err(Error::Truncated),
        }
    }

    /// 校验并取出序号
    pub fn counter(&self) -> Result<Counter, Error> {
        let (counter, parity) = decode_counter(self.counter_byte);
        if check_parity(counter.get() as u32, parity) {
            Ok(counter)
        } else {
            Err(Error::CounterParity)
        }
    }
}

/// 解析带校验数值的十进制 ASCII 字段并校验
///
/// 允许末尾的换行与填充的 0 字节。
pub fn decode_value_field(field: &[u8]) -> Result<i32, Error> {
    let text = core::str::from_utf8(field).map_err(|_| Error::MalformedValue)?;
    let encoded: i32 = text
        .trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
        .parse()
        .map_err(|_| Error::MalformedValue)?;

    let (value, parity) = decode_value(encoded);
    if check_parity(value as u32, parity) {
        Ok(value)
    } else {
        Err(Error::ValueParity)
    }
}

/// 飞艇 → 遥控器的确认报告
///
/// 格式: `[遥控器地址, 飞艇地址, 状态字节, CONFIRMATION, 计数字节, "VALID"/"ERROR"]`
pub fn encode_confirmation(flags: u8, counter: Counter, valid: bool) -> Result<Packet, Error> {
    let mut packet = Packet::new();
    push_all(
        &mut packet,
        &[
            CONTROLLER_ADDRESS,
            AIRSHIP_ADDRESS,
            flags,
            ReportType::Confirmation as u8,
            encode_counter(counter),
        ],
    )?;
    let payload = if valid {
        CONFIRMATION_VALID
    } else {
        CONFIRMATION_ERROR
    };
    push_all(&mut packet, payload.as_bytes())?;
    Ok(packet)
}

/// 飞艇 → 遥控器的测量数据报告
pub fn encode_measured_data(flags: u8, payload: &str) -> Result<Packet, Error> {
    let mut packet = Packet::new();
    push_all(
        &mut packet,
        &[
            CONTROLLER_ADDRESS,
            AIRSHIP_ADDRESS,
            flags,
            ReportType::MeasuredData as u8,
        ],
    )?;
    push_all(&mut packet, payload.as_bytes())?;
    Ok(packet)
}

/// 报告内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportBody<'a> {
    Confirmation { counter: Counter, payload: &'a str },
    MeasuredData(&'a str),
}

/// 拆开的报告数据包
///
/// 报告类型或计数字节损坏时，状态字节仍然可用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFrame<'a> {
    pub destination: u8,
    pub source: u8,
    pub flags: FlagBits,
    pub body: Result<ReportBody<'a>, Error>,
}

impl<'a> ReportFrame<'a> {
    /// 拆分报告数据包
    pub fn split(bytes: &'a [u8]) -> Result<Self, Error> {
        let [destination, source, flags, report_type, rest @ ..] = bytes else {
            return Err(Error::Truncated);
        };

        let body = ReportType::try_from(*report_type).and_then(|report_type| match report_type {
            ReportType::Confirmation => {
                let [counter_byte, payload @ ..] = rest else {
                    return Err(Error::Truncated);
                };
                let (counter, parity) = decode_counter(*counter_byte);
                if !check_parity(counter.get() as u32, parity) {
                    return Err(Error::CounterParity);
                }
                Ok(ReportBody::Confirmation {
                    counter,
                    payload: ascii(payload)?,
                })
            }
            ReportType::MeasuredData => Ok(ReportBody::MeasuredData(ascii(rest)?)),
        });

        Ok(ReportFrame {
            destination: *destination,
            source: *source,
            flags: decode_flags(*flags),
            body,
        })
    }
}

fn ascii(bytes: &[u8]) -> Result<&str, Error> {
    core::str::from_utf8(bytes)
        .map(|text| text.trim_end_matches('\0'))
        .map_err(|_| Error::MalformedPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parity::encode_flags, CommandId};

    #[test]
    fn plain_command_layout() {
        let cmd = Command::new(CommandId::Up, Counter::new(3), None);
        let packet = encode_command(&cmd).unwrap();
        assert_eq!(packet.as_slice(), &[0x11, 0xBB, 0x03, 0xF0]);
    }

    #[test]
    fn value_command_carries_decimal_with_parity() {
        let cmd = Command::new(CommandId::SetExactHeight, Counter::new(1), Some(6.2));
        let packet = encode_command(&cmd).unwrap();
        assert_eq!(&packet[..4], &[0x11, 0xBB, 0x81, 0xCC]);
        assert_eq!(&packet[4..], b"1241");
        assert_eq!(decode_value_field(&packet[4..]), Ok(620));
    }

    #[test]
    fn negative_value_field() {
        let cmd = Command::new(CommandId::PotentiometerAngle, Counter::new(1), Some(-45.0));
        let packet = encode_command(&cmd).unwrap();
        assert_eq!(decode_value_field(&packet[4..]), Ok(-45));
    }

    #[test]
    fn value_field_tolerates_line_ending() {
        assert_eq!(decode_value_field(b"1241\r\n"), Ok(620));
        assert_eq!(decode_value_field(b"6\0\0"), Ok(3));
    }

    #[test]
    fn value_field_errors() {
        assert_eq!(decode_value_field(b""), Err(Error::MalformedValue));
        assert_eq!(decode_value_field(b"12a"), Err(Error::MalformedValue));
        // 1240 = 620 << 1，校验位被清零
        assert_eq!(decode_value_field(b"1240"), Err(Error::ValueParity));
    }

    #[test]
    fn command_frame_split() {
        let frame = CommandFrame::split(&[0x11, 0xBB, 0x81, 0xCC, b'4']).unwrap();
        assert_eq!(frame.destination, 0x11);
        assert_eq!(frame.source, 0xBB);
        assert_eq!(frame.counter(), Ok(Counter::new(1)));
        assert_eq!(frame.id_byte, 0xCC);
        assert_eq!(frame.value, b"4");
        assert_eq!(CommandFrame::split(&[0x11, 0xBB, 0x81]), Err(Error::Truncated));
    }

    #[test]
    fn command_frame_counter_parity() {
        let frame = CommandFrame::split(&[0x11, 0xBB, 0x01, 0xF0]).unwrap();
        assert_eq!(frame.counter(), Err(Error::CounterParity));
    }

    #[test]
    fn confirmation_layout() {
        let packet = encode_confirmation(encode_flags(true, false), Counter::new(3), true).unwrap();
        assert_eq!(&packet[..5], &[0xBB, 0x11, 0x50, 0x00, 0x03]);
        assert_eq!(&packet[5..], b"VALID");

        let frame = ReportFrame::split(&packet).unwrap();
        assert_eq!(frame.destination, 0xBB);
        assert_eq!(frame.flags.land(), Some(true));
        assert_eq!(
            frame.body,
            Ok(ReportBody::Confirmation {
                counter: Counter::new(3),
                payload: "VALID"
            })
        );
    }

    #[test]
    fn error_confirmation_payload() {
        let packet = encode_confirmation(0, Counter::new(5), false).unwrap();
        assert_eq!(&packet[5..], b"ERROR");
    }

    #[test]
    fn measured_data_has_no_counter() {
        let packet = encode_measured_data(encode_flags(false, true), "Power : 110\n").unwrap();
        assert_eq!(&packet[..4], &[0xBB, 0x11, 0x05, 0xFF]);
        let frame = ReportFrame::split(&packet).unwrap();
        assert_eq!(frame.body, Ok(ReportBody::MeasuredData("Power : 110\n")));
        assert_eq!(frame.flags.fly_forward(), Some(true));
    }

    #[test]
    fn measured_data_too_long() {
        let long = "CurrentHeight : 1.00\nRequiredHeight : 2.00\n";
        assert_eq!(encode_measured_data(0, long), Err(Error::PayloadTooLong));
    }

    #[test]
    fn report_with_unknown_type_keeps_flags() {
        let frame = ReportFrame::split(&[0xBB, 0x11, 0x50, 0x42]).unwrap();
        assert_eq!(frame.flags.land(), Some(true));
        assert_eq!(frame.body, Err(Error::UnknownReport(0x42)));
    }

    #[test]
    fn confirmation_with_broken_counter() {
        let frame = ReportFrame::split(&[0xBB, 0x11, 0x00, 0x00, 0x01, b'V']).unwrap();
        assert_eq!(frame.body, Err(Error::CounterParity));
    }
}
