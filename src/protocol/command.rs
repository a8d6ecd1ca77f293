//! 遥控命令

use super::{parity::Counter, CommandId};
use crate::config::{MAX_MOTOR_POWER, MAX_STEERING_ANGLE};

/// 遥控器发出的命令
///
/// 数值只对 SET_EXACT_HEIGHT (cm)、POTENTIOMETER_ANGLE (°)、SET_MOTOR_POWER 有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub id: CommandId,
    pub value: i32,
    pub counter: Counter,
}

impl Command {
    /// 创建命令并校验数值
    ///
    /// 校验失败时退化为不需要确认的 SAY_HI。
    /// - SET_EXACT_HEIGHT: 需要给出高度（m），转换为 cm
    /// - POTENTIOMETER_ANGLE: 角度在 ±270° 以内
    /// - SET_MOTOR_POWER: 功率在 0~180 之间
    pub fn new(id: CommandId, counter: Counter, value: Option<f32>) -> Self {
        let checked = match id {
            CommandId::SetExactHeight => value
                .filter(|v| v.is_finite())
                .map(|meters| libm::roundf(meters * 100.0) as i32),
            CommandId::PotentiometerAngle => value
                .filter(|v| libm::fabsf(*v) <= MAX_STEERING_ANGLE)
                .map(|angle| angle as i32),
            CommandId::SetMotorPower => value
                .filter(|v| *v >= 0.0 && *v <= MAX_MOTOR_POWER as f32)
                .map(|power| power as i32),
            _ => Some(0),
        };

        match checked {
            Some(value) => Command { id, value, counter },
            None => {
                warn!("INVALID COMMAND! {:?} 的数值无效", id);
                Command {
                    id: CommandId::SayHi,
                    value: 0,
                    counter,
                }
            }
        }
    }
}

/// 飞艇端校验通过的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ValidCommand {
    pub id: CommandId,
    pub value: i32,
}

impl ValidCommand {
    /// 不带数值的命令
    pub const fn plain(id: CommandId) -> Self {
        ValidCommand { id, value: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_height_is_sent_in_centimetres() {
        let cmd = Command::new(CommandId::SetExactHeight, Counter::new(4), Some(6.2));
        assert_eq!(cmd.id, CommandId::SetExactHeight);
        assert_eq!(cmd.value, 620);
        assert_eq!(cmd.counter, Counter::new(4));
    }

    #[test]
    fn exact_height_without_value_degrades_to_heartbeat() {
        let cmd = Command::new(CommandId::SetExactHeight, Counter::new(4), None);
        assert_eq!(cmd.id, CommandId::SayHi);
        assert_eq!(cmd.counter, Counter::new(4));
    }

    #[test]
    fn angle_limits() {
        let ok = Command::new(CommandId::PotentiometerAngle, Counter::new(1), Some(-270.0));
        assert_eq!((ok.id, ok.value), (CommandId::PotentiometerAngle, -270));
        let bad = Command::new(CommandId::PotentiometerAngle, Counter::new(1), Some(271.0));
        assert_eq!(bad.id, CommandId::SayHi);
    }

    #[test]
    fn motor_power_limits() {
        let ok = Command::new(CommandId::SetMotorPower, Counter::new(1), Some(180.0));
        assert_eq!((ok.id, ok.value), (CommandId::SetMotorPower, 180));
        let low = Command::new(CommandId::SetMotorPower, Counter::new(1), Some(-1.0));
        assert_eq!(low.id, CommandId::SayHi);
        let high = Command::new(CommandId::SetMotorPower, Counter::new(1), Some(181.0));
        assert_eq!(high.id, CommandId::SayHi);
    }

    #[test]
    fn plain_commands_ignore_value() {
        let cmd = Command::new(CommandId::Up, Counter::new(9), Some(3.0));
        assert_eq!((cmd.id, cmd.value), (CommandId::Up, 0));
    }
}
