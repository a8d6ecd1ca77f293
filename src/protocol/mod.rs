//! # 无线通信协议
//!
//! 数据包格式（两个方向相同）:
//! `[目的地址, 源地址, 内容相关字节..., 可选的 ASCII 载荷]`
//!
//! - 飞艇 → 遥控器: `[dest, src, 状态字节, 报告类型, 计数字节?, 载荷?]`
//! - 遥控器 → 飞艇: `[dest, src, 计数字节, 命令ID, 带校验数值的十进制 ASCII?]`

pub mod command;
pub mod packet;
pub mod parity;
pub mod telemetry;

pub use command::{Command, ValidCommand};
pub use packet::{Packet, MAX_PACKET_LEN};
pub use parity::{Counter, FlagBits};

use thiserror::Error;

/// 命令 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandId {
    /// 开始/停止降落
    Land = 0xFF,
    /// 上升 1 m
    Up = 0xF0,
    /// 下降 1 m
    Down = 0x0F,
    /// 设置精确高度，数值单位 cm
    SetExactHeight = 0xCC,
    /// 心跳，不需要确认
    SayHi = 0x33,
    /// 转向舵机角度
    PotentiometerAngle = 0x66,
    /// 开启/关闭前进电机
    FlyForward = 0x99,
    /// 前进电机功率
    SetMotorPower = 0x3C,
    /// 关闭电机
    MotorsOff = 0x55,
}

impl CommandId {
    /// 命令是否带有数值字段
    pub const fn carries_value(self) -> bool {
        matches!(
            self,
            CommandId::SetExactHeight | CommandId::PotentiometerAngle | CommandId::SetMotorPower
        )
    }

    /// 命令是否需要飞艇确认
    pub const fn needs_confirmation(self) -> bool {
        !matches!(self, CommandId::SayHi)
    }
}

impl TryFrom<u8> for CommandId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0xFF => CommandId::Land,
            0xF0 => CommandId::Up,
            0x0F => CommandId::Down,
            0xCC => CommandId::SetExactHeight,
            0x33 => CommandId::SayHi,
            0x66 => CommandId::PotentiometerAngle,
            0x99 => CommandId::FlyForward,
            0x3C => CommandId::SetMotorPower,
            0x55 => CommandId::MotorsOff,
            other => return Err(Error::UnknownCommand(other)),
        })
    }
}

/// 飞艇报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportType {
    /// 命令确认，带计数字节
    Confirmation = 0x00,
    /// 测量数据
    MeasuredData = 0xFF,
}

impl TryFrom<u8> for ReportType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ReportType::Confirmation),
            0xFF => Ok(ReportType::MeasuredData),
            other => Err(Error::UnknownReport(other)),
        }
    }
}

/// 确认载荷：命令有效
pub const CONFIRMATION_VALID: &str = "VALID";
/// 确认载荷：命令无效
pub const CONFIRMATION_ERROR: &str = "ERROR";

/// 协议错误
///
/// 只在链路会话内部使用，不会传递到飞行状态机。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("数据包长度不足")]
    Truncated,
    #[error("数据包发往 {0:#04x}，不是本机")]
    AddressMismatch(u8),
    #[error("计数字节校验失败")]
    CounterParity,
    #[error("未知命令 {0:#04x}")]
    UnknownCommand(u8),
    #[error("未知报告类型 {0:#04x}")]
    UnknownReport(u8),
    #[error("数值字段不是十进制整数")]
    MalformedValue,
    #[error("数值校验失败")]
    ValueParity,
    #[error("载荷不是 ASCII 文本")]
    MalformedPayload,
    #[error("载荷超出无线数据包长度")]
    PayloadTooLong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_match_wire_bytes() {
        let all = [
            (0xFF, CommandId::Land),
            (0xF0, CommandId::Up),
            (0x0F, CommandId::Down),
            (0xCC, CommandId::SetExactHeight),
            (0x33, CommandId::SayHi),
            (0x66, CommandId::PotentiometerAngle),
            (0x99, CommandId::FlyForward),
            (0x3C, CommandId::SetMotorPower),
            (0x55, CommandId::MotorsOff),
        ];
        for (byte, id) in all {
            assert_eq!(CommandId::try_from(byte), Ok(id));
            assert_eq!(id as u8, byte);
        }
    }

    #[test]
    fn unknown_command_byte_is_rejected() {
        assert_eq!(CommandId::try_from(0x01), Err(Error::UnknownCommand(0x01)));
        assert_eq!(CommandId::try_from(0x00), Err(Error::UnknownCommand(0x00)));
    }

    #[test]
    fn only_value_commands_carry_value() {
        assert!(CommandId::SetExactHeight.carries_value());
        assert!(CommandId::PotentiometerAngle.carries_value());
        assert!(CommandId::SetMotorPower.carries_value());
        assert!(!CommandId::Up.carries_value());
        assert!(!CommandId::SayHi.needs_confirmation());
        assert!(CommandId::MotorsOff.needs_confirmation());
    }

    #[test]
    fn report_types() {
        assert_eq!(ReportType::try_from(0x00), Ok(ReportType::Confirmation));
        assert_eq!(ReportType::try_from(0xFF), Ok(ReportType::MeasuredData));
        assert_eq!(ReportType::try_from(0x10), Err(Error::UnknownReport(0x10)));
    }
}
