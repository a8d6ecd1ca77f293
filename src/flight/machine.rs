//! 目标高度与降落状态机

use super::state::FlightState;
use crate::{
    config::{
        LANDING_BAND_SPLIT, LANDING_HIGH_TARGET, LANDING_HIGH_TOLERANCE, LANDING_LOW_TARGET,
        LANDING_LOW_TOLERANCE, MIN_REQUIRED_HEIGHT, REACQUISITION_VALIDITY, TOUCHDOWN_HEIGHT,
        TOUCHDOWN_VALIDITY,
    },
    estimator::HeightEstimate,
    protocol::{CommandId, ValidCommand},
};

/// 飞行控制状态机
#[derive(Debug, Default)]
pub struct FlightController {
    state: FlightState,
}

impl FlightController {
    pub const fn new() -> Self {
        FlightController {
            state: FlightState::new(),
        }
    }

    /// 从给定状态开始
    pub const fn from_state(state: FlightState) -> Self {
        FlightController { state }
    }

    pub fn state(&self) -> &FlightState {
        &self.state
    }

    /// 控制循环的一个周期
    ///
    /// 依次处理失联降落、高度更新、超声波重新有效时的目标平滑以及自主降落。
    pub fn tick(&mut self, estimate: HeightEstimate, validity_rate: f32, link_lost: bool) {
        if link_lost && !self.state.land {
            warn!("链路超时，自动降落");
            self.enter_landing();
        }

        let old_height = self.state.current_height;
        let was_valid = self.state.ultrasonic_valid;
        self.state.current_height = estimate.height;
        self.state.ultrasonic_valid = estimate.ultrasonic_valid;

        if self.state.land {
            self.converge_landing(validity_rate);
        } else {
            self.smooth_reacquisition(old_height, was_valid, validity_rate);
        }
    }

    /// 超声波由无效变为有效时，按旧高度与目标的差值重新设定目标
    fn smooth_reacquisition(&mut self, old_height: f32, was_valid: bool, validity_rate: f32) {
        let state = &mut self.state;
        if validity_rate <= REACQUISITION_VALIDITY
            && !was_valid
            && state.ultrasonic_valid
            && !state.do_not_move
        {
            let rebased = state.current_height + (state.required_height - old_height);
            state.required_height = rebased.max(MIN_REQUIRED_HEIGHT);
            debug!("超声波重新有效, 目标高度: {}", state.required_height);
        }
    }

    /// 分两个高度段把目标高度压向地面，着陆后停止升力电机
    fn converge_landing(&mut self, validity_rate: f32) {
        let state = &mut self.state;
        let current = state.current_height;
        let valid = state.ultrasonic_valid;

        if valid
            && current > LANDING_BAND_SPLIT
            && !near(state.required_height, LANDING_HIGH_TARGET, LANDING_HIGH_TOLERANCE)
        {
            state.required_height = LANDING_HIGH_TARGET;
            debug!("降落: 目标高度 {}", LANDING_HIGH_TARGET);
        } else if valid
            && current < LANDING_BAND_SPLIT
            && !near(state.required_height, LANDING_LOW_TARGET, LANDING_LOW_TOLERANCE)
        {
            state.required_height = LANDING_LOW_TARGET;
            debug!("降落: 目标高度 {}", LANDING_LOW_TARGET);
        } else if validity_rate == 0.0 && current - state.required_height < 1.0 {
            // 超声波完全失效时继续下降
            state.required_height -= 1.0;
            debug!("降落: 超声波失效, 目标高度 {}", state.required_height);
        } else if validity_rate >= TOUCHDOWN_VALIDITY && valid && current < TOUCHDOWN_HEIGHT {
            if !state.do_not_move {
                info!("已着陆, 关闭升力电机");
            }
            state.do_not_move = true;
        }
    }

    fn enter_landing(&mut self) {
        self.state.land = true;
        self.state.fly_forward = false;
        self.state.required_height = LANDING_HIGH_TARGET;
    }

    /// 执行一条校验通过的命令
    pub fn process(&mut self, cmd: ValidCommand) {
        if self.state.land {
            self.process_landing(cmd);
        } else {
            self.process_flying(cmd);
        }
    }

    fn process_flying(&mut self, cmd: ValidCommand) {
        let state = &mut self.state;
        let current = state.current_height;

        match cmd.id {
            CommandId::Land => {
                self.enter_landing();
                info!("开始降落");
            }
            CommandId::Up => {
                state.required_height = if state.required_height < current {
                    current + 1.0
                } else {
                    state.required_height + 1.0
                };
                state.do_not_move = false;
                info!("目标高度: {}", state.required_height);
            }
            CommandId::Down => {
                if state.do_not_move && current < MIN_REQUIRED_HEIGHT {
                    state.required_height = 0.0;
                } else {
                    state.do_not_move = false;
                    state.required_height = if state.ultrasonic_valid {
                        (current - 1.0).max(MIN_REQUIRED_HEIGHT)
                    } else if state.required_height > current {
                        current - 1.0
                    } else {
                        state.required_height - 1.0
                    };
                }
                info!("目标高度: {}", state.required_height);
            }
            CommandId::SetExactHeight => {
                if state.ultrasonic_valid && cmd.value < 0 {
                    state.required_height = 0.0;
                } else {
                    state.required_height = cmd.value as f32 / 100.0;
                    state.do_not_move = false;
                }
                info!("目标高度: {}", state.required_height);
            }
            _ => self.actuate(cmd),
        }
    }

    fn process_landing(&mut self, cmd: ValidCommand) {
        match cmd.id {
            CommandId::Land => {
                self.state.land = false;
                self.state.required_height = self.state.current_height;
                info!("停止降落, 目标高度: {}", self.state.required_height);
            }
            CommandId::Up | CommandId::Down | CommandId::SetExactHeight => {
                warn!("降落中忽略 {:?}", cmd.id);
            }
            _ => self.actuate(cmd),
        }
    }

    /// 两种状态下相同的转向与电机命令
    fn actuate(&mut self, cmd: ValidCommand) {
        let state = &mut self.state;
        match cmd.id {
            CommandId::PotentiometerAngle => {
                state.steering_angle = cmd.value;
                info!("转向角度: {}", cmd.value);
            }
            CommandId::SetMotorPower => {
                state.steering_power = cmd.value;
                info!("前进电机功率: {}", cmd.value);
            }
            CommandId::FlyForward => {
                state.fly_forward = !state.fly_forward;
                info!("前进: {}", state.fly_forward);
            }
            CommandId::MotorsOff => {
                state.do_not_move = true;
                info!("关闭电机");
            }
            _ => {}
        }
    }
}

/// `value` 是否在 `[target - tolerance, target + tolerance)` 内
fn near(value: f32, target: f32, tolerance: f32) -> bool {
    value >= target - tolerance && value < target + tolerance
}
