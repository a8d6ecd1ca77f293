//! 飞行状态

use crate::{config::DEFAULT_MOTOR_POWER, protocol::parity::encode_flags};

/// 飞行状态，由飞行控制状态机独占修改
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlightState {
    /// 正在降落
    pub land: bool,
    /// 前进电机开启
    pub fly_forward: bool,
    /// 升力电机停止
    pub do_not_move: bool,
    /// 目标高度 (m)，按气压偏移约定可以为负
    pub required_height: f32,
    /// 当前高度 (m)
    pub current_height: f32,
    /// 最近一次超声波读数有效
    pub ultrasonic_valid: bool,
    /// 转向舵机角度 (°)
    pub steering_angle: i32,
    /// 前进电机功率 (0~180)
    pub steering_power: i32,
}

impl FlightState {
    pub const fn new() -> Self {
        FlightState {
            land: false,
            fly_forward: false,
            do_not_move: true,
            required_height: 0.0,
            current_height: 0.0,
            ultrasonic_valid: false,
            steering_angle: 0,
            steering_power: DEFAULT_MOTOR_POWER,
        }
    }

    /// 报告中的状态字节
    pub const fn flags(&self) -> u8 {
        encode_flags(self.land, self.fly_forward)
    }

    /// 前进电机是否应当运转
    pub const fn forward_thrust(&self) -> bool {
        self.fly_forward && !self.do_not_move
    }
}

impl Default for FlightState {
    fn default() -> Self {
        Self::new()
    }
}
