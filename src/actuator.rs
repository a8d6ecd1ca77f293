//! # 执行机构输出
//!
//! 把升力、转向角度与前进功率换算为电调与舵机的脉宽 (us)。

use crate::{
    config::{
        MAX_MOTOR_POWER, PID_OUTPUT_MAX, PID_OUTPUT_MIN, PULSE_MAX_US, PULSE_MIN_US,
        PULSE_NEUTRAL_US, SERVO_RANGE,
    },
    flight::FlightState,
};

/// 一个控制周期的全部输出脉宽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulses {
    /// 两个升力电机（双向电调）
    pub lift: u16,
    /// 前进电机
    pub forward: u16,
    /// 转向舵机
    pub servo: u16,
}

impl Pulses {
    /// 上电时的安全输出：电机停转、舵机居中
    pub const IDLE: Pulses = Pulses {
        lift: PULSE_NEUTRAL_US,
        forward: PULSE_MIN_US,
        servo: PULSE_NEUTRAL_US,
    };

    /// 按飞行状态与升力输出计算
    pub fn new(state: &FlightState, lift: Option<f32>) -> Self {
        Pulses {
            lift: lift_pulse(lift),
            forward: if state.forward_thrust() {
                forward_pulse(state.steering_power)
            } else {
                PULSE_MIN_US
            },
            servo: servo_pulse(state.steering_angle),
        }
    }
}

/// 升力 (N) 换算为双向电调脉宽
///
/// 0 N 对应中位，上下两侧分别按输出上下限线性缩放。
pub fn lift_pulse(force: Option<f32>) -> u16 {
    let Some(force) = force else {
        return PULSE_NEUTRAL_US;
    };
    let half = (PULSE_MAX_US - PULSE_NEUTRAL_US) as f32;
    let offset = if force >= 0.0 {
        (force / PID_OUTPUT_MAX).min(1.0) * half
    } else {
        -(force / PID_OUTPUT_MIN).min(1.0) * half
    };
    (PULSE_NEUTRAL_US as f32 + libm::roundf(offset)) as u16
}

/// 前进电机功率 (0~180) 换算为脉宽
pub fn forward_pulse(power: i32) -> u16 {
    scale(power.clamp(0, MAX_MOTOR_POWER), MAX_MOTOR_POWER)
}

/// 转向角度换算为舵机脉宽，0° 为中位
pub fn servo_pulse(angle: i32) -> u16 {
    let position = (angle + SERVO_RANGE / 2).clamp(0, SERVO_RANGE);
    scale(position, SERVO_RANGE)
}

fn scale(value: i32, range: i32) -> u16 {
    let span = (PULSE_MAX_US - PULSE_MIN_US) as i32;
    (PULSE_MIN_US as i32 + value * span / range) as u16
}
