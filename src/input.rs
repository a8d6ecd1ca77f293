//! # 遥控器输入
//!
//! 按键优先级 LAND > UP > DOWN > FLY_FORWARD，按键之间至少间隔 800 ms；
//! 之后是转向电位器的角度变化，最后是心跳。

use crate::{
    config::{
        BUTTON_INTERVAL, POTENTIOMETER_K, POTENTIOMETER_LIMIT, POTENTIOMETER_MOVING,
        POTENTIOMETER_Q, POTENTIOMETER_STEP,
    },
    link::controller::AirshipStatus,
    protocol::CommandId,
    time::{elapsed, Instant},
};

/// 按键状态，true 为按下
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons {
    pub land: bool,
    pub up: bool,
    pub down: bool,
    pub fly_forward: bool,
}

/// 用户输入的一条命令
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UserInput {
    pub id: CommandId,
    pub value: Option<f32>,
}

impl UserInput {
    const fn plain(id: CommandId) -> Self {
        UserInput { id, value: None }
    }
}

/// 指示灯状态，true 为点亮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Indicators {
    pub land: bool,
    pub up: bool,
    pub down: bool,
    pub fly_forward: bool,
}

/// 电位器 ADC 读数换算为相对中心位置的角度 (°)
pub fn relative_angle(raw: f32, centre: f32) -> f32 {
    let centre_angle = (centre - POTENTIOMETER_Q) / POTENTIOMETER_K;
    let angle = (raw - POTENTIOMETER_Q) / POTENTIOMETER_K;
    centre_angle - angle
}

/// 从一组 ADC 读数中取中位数，去掉偶发的尖峰
pub fn reject_outliers<const N: usize>(mut samples: [u16; N]) -> u16 {
    samples.sort_unstable();
    samples.get(N / 2).copied().unwrap_or(0)
}

/// 转向电位器角度跟踪
#[derive(Debug, Clone)]
pub struct AngleTracker {
    centre: f32,
    angle: f32,
    reference: f32,
    moving: bool,
    last_sent: f32,
}

impl AngleTracker {
    /// `centre`: 中心位置的 ADC 读数
    pub const fn new(centre: f32) -> Self {
        AngleTracker {
            centre,
            angle: 0.0,
            reference: 0.0,
            moving: false,
            last_sent: 0.0,
        }
    }

    /// 当前角度
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// 电位器是否正在转动
    pub fn moving(&self) -> bool {
        self.moving
    }

    /// 输入一次 ADC 读数
    ///
    /// 与上一个参考角度相差 2° 以上时判定为正在转动。
    pub fn sample(&mut self, raw: f32) {
        self.angle = relative_angle(raw, self.centre);
        if libm::fabsf(self.angle - self.reference) >= POTENTIOMETER_MOVING {
            self.reference = self.angle;
            self.moving = true;
        } else {
            self.moving = false;
        }
    }

    /// 电位器停止转动且角度变化超过 5° 时返回新的角度
    ///
    /// 角度限制在 ±90° 以内。
    pub fn take_change(&mut self) -> Option<f32> {
        let current = self.angle.clamp(-POTENTIOMETER_LIMIT, POTENTIOMETER_LIMIT);
        if libm::fabsf(self.last_sent - current) >= POTENTIOMETER_STEP && !self.moving {
            self.last_sent = current;
            Some(current)
        } else {
            None
        }
    }
}

/// 遥控器输入采样
pub struct InputSampler {
    last_command: Instant,
    angle: AngleTracker,
    lit: Option<CommandId>,
}

impl InputSampler {
    pub fn new(boot: Instant, centre: f32) -> Self {
        InputSampler {
            last_command: boot,
            angle: AngleTracker::new(centre),
            lit: None,
        }
    }

    pub fn angle(&mut self) -> &mut AngleTracker {
        &mut self.angle
    }

    /// 取出下一条用户命令
    ///
    /// 只应在没有命令等待确认时调用。
    pub fn poll(&mut self, buttons: Buttons, now: Instant, heartbeat_due: bool) -> Option<UserInput> {
        let debounced = elapsed(now, self.last_command) > BUTTON_INTERVAL;

        let input = if buttons.land && debounced {
            UserInput::plain(CommandId::Land)
        } else if buttons.up && debounced {
            UserInput::plain(CommandId::Up)
        } else if buttons.down && debounced {
            UserInput::plain(CommandId::Down)
        } else if buttons.fly_forward && debounced {
            UserInput::plain(CommandId::FlyForward)
        } else if let Some(angle) = self.angle.take_change() {
            UserInput {
                id: CommandId::PotentiometerAngle,
                value: Some(angle),
            }
        } else if heartbeat_due {
            UserInput::plain(CommandId::SayHi)
        } else {
            return None;
        };

        if input.id != CommandId::SayHi {
            self.last_command = now;
        }
        if matches!(input.id, CommandId::Up | CommandId::Down) {
            self.lit = Some(input.id);
        }
        Some(input)
    }

    /// 指示灯
    ///
    /// LAND 与 FLY_FORWARD 跟随飞艇报告的状态；
    /// UP/DOWN 在新命令时点亮，命令确认且超过按键间隔后熄灭。
    pub fn indicators(&mut self, status: AirshipStatus, awaiting: bool, now: Instant) -> Indicators {
        if !awaiting && elapsed(now, self.last_command) > BUTTON_INTERVAL {
            self.lit = None;
        }
        Indicators {
            land: status.land,
            up: self.lit == Some(CommandId::Up),
            down: self.lit == Some(CommandId::Down),
            fly_forward: status.fly_forward,
        }
    }
}
