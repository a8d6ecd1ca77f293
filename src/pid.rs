//! # PID 控制器
//!
//! PID 算法的原理是根据误差的比例、积分和微分，来计算控制量，
//! 从而使系统的实际输出接近期望输出。
//!
//! 这里根据目标高度与当前高度的误差计算升力（N），
//! 再由升力电机的电调换算为 PWM 信号。
//!
//! `compute` 必须按固定的采样周期调用；积分与微分系数在配置时已按采样周期换算。
//! 微分项默认为 kd × 误差变化量，也可以换成一阶滤波的形式。

use crate::{
    config::{
        PID_DERIVATIVE, PID_KD, PID_KI, PID_KP, PID_N, PID_OUTPUT_MAX, PID_OUTPUT_MIN,
        PID_SAMPLE_TIME_MS,
    },
    flight::FlightState,
};

/// 未指定采样周期时使用的默认值
const DEFAULT_SAMPLE_TIME_MS: u32 = 200;

/// 微分项的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Derivative {
    /// kd × 误差变化量
    #[default]
    Classic,
    /// 按微分滤波系数 n 做一阶低通滤波
    Filtered,
}

/// PID 控制器的结构体
#[derive(Debug, Clone)]
pub struct PidController {
    /// 比例系数
    kp: f32,
    /// 积分系数，已乘以采样周期
    ki: f32,
    /// 微分系数，已除以采样周期
    kd: f32,
    /// 微分项的计算方式
    mode: Derivative,
    /// 微分滤波系数
    d1: f32,
    d2: f32,
    /// 输出上限
    upper: f32,
    /// 输出下限
    lower: f32,
    /// 积分
    integral: f32,
    /// 滤波后的微分项
    derivative: f32,
    /// 上一次的误差
    last_error: f32,
}

// 实现 PID 控制器的方法
impl PidController {
    /// 创建一个没有输出限制的 PID 控制器
    pub fn new(kp: f32, ki: f32, kd: f32, n: f32, sample_time_ms: u32) -> Self {
        let mut pid = PidController {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            mode: Derivative::Classic,
            d1: 0.0,
            d2: 0.0,
            upper: f32::INFINITY,
            lower: f32::NEG_INFINITY,
            integral: 0.0,
            derivative: 0.0,
            last_error: 0.0,
        };
        pid.configure(kp, ki, kd, n, sample_time_ms);
        pid
    }

    /// 设置参数
    ///
    /// n: 微分滤波系数；sample_time_ms: 采样周期，为 0 时使用 200 ms。
    pub fn configure(&mut self, kp: f32, ki: f32, kd: f32, n: f32, sample_time_ms: u32) {
        let sample_time_ms = if sample_time_ms > 0 {
            sample_time_ms
        } else {
            DEFAULT_SAMPLE_TIME_MS
        };
        let ts = sample_time_ms as f32 / 1000.0;

        self.kp = kp;
        self.ki = ki * ts;
        self.kd = kd / ts;
        self.d1 = self.kd * (n * ts / (1.0 + n * ts));
        self.d2 = 1.0 / (1.0 + n * ts);
        self.last_error = 0.0;
    }

    /// 选择微分项的计算方式
    pub fn set_derivative(&mut self, mode: Derivative) {
        self.mode = mode;
        self.derivative = 0.0;
    }

    /// 设置输出范围
    ///
    /// 下限不小于上限时取消限制。
    pub fn set_output_limits(&mut self, max: f32, min: f32) {
        if min < max {
            self.upper = max;
            self.lower = min;
        } else {
            self.upper = f32::INFINITY;
            self.lower = f32::NEG_INFINITY;
        }
    }

    /// 清空积分与误差记录
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.derivative = 0.0;
        self.last_error = 0.0;
    }

    /// 计算 PID 控制器的输出
    ///
    /// setpoint: 期望值；measurement: 当前测量值
    pub fn compute(&mut self, setpoint: f32, measurement: f32) -> f32 {
        // 计算误差
        let error = setpoint - measurement;
        let delta = error - self.last_error;

        // 积分项单独限幅，防止积分饱和
        self.integral = self.clamp(self.integral + error * self.ki);

        self.derivative = match self.mode {
            Derivative::Classic => self.kd * delta,
            // 一阶滤波的微分项
            Derivative::Filtered => self.d1 * delta + self.d2 * self.derivative,
        };

        // 更新上一次误差
        self.last_error = error;

        self.clamp(self.kp * error + self.integral + self.derivative)
    }

    fn clamp(&self, value: f32) -> f32 {
        if value > self.upper {
            self.upper
        } else if value < self.lower {
            self.lower
        } else {
            value
        }
    }
}

/// 升力 PID 控制器
///
/// 按目标高度与当前高度计算升力，电机停止时重置。
pub struct LiftController {
    pid: PidController,
}

impl LiftController {
    /// 使用配置中的参数创建升力控制器
    pub fn new() -> Self {
        let mut pid = PidController::new(PID_KP, PID_KI, PID_KD, PID_N, PID_SAMPLE_TIME_MS);
        pid.set_output_limits(PID_OUTPUT_MAX, PID_OUTPUT_MIN);
        pid.set_derivative(PID_DERIVATIVE);
        LiftController { pid }
    }

    /// 一个采样周期的升力输出
    ///
    /// 升力电机停止时返回 None。
    pub fn compute(&mut self, state: &FlightState) -> Option<f32> {
        if state.do_not_move {
            self.pid.reset();
            return None;
        }
        Some(
            self.pid
                .compute(state.required_height, state.current_height),
        )
    }
}

impl Default for LiftController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn gains_are_scaled_by_sample_time() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 30.0, 200);
        // 只有积分项
        assert!(close(pid.compute(1.0, 0.0), 0.2));
        assert!(close(pid.compute(1.0, 0.0), 0.4));
    }

    #[test]
    fn zero_sample_time_falls_back_to_default() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 30.0, 0);
        assert!(close(pid.compute(1.0, 0.0), 0.2));
    }

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new(2.0, 0.0, 0.0, 30.0, 200);
        assert!(close(pid.compute(3.0, 1.0), 4.0));
        assert!(close(pid.compute(1.0, 3.0), -4.0));
    }

    #[test]
    fn classic_derivative_follows_error_change() {
        let mut pid = PidController::new(0.0, 0.0, 1.3, 30.0, 200);
        // kd = 1.3 / 0.2
        assert!(close(pid.compute(1.0, 0.0), 6.5));
        // 误差不变时没有微分项
        assert!(close(pid.compute(1.0, 0.0), 0.0));
        assert!(close(pid.compute(1.0, 0.5), -3.25));
    }

    #[test]
    fn filtered_derivative_reacts_to_error_step() {
        let mut pid = PidController::new(0.0, 0.0, 1.3, 30.0, 200);
        pid.set_derivative(Derivative::Filtered);
        // kd = 6.5, d1 = 6.5 * 6 / 7
        let first = pid.compute(1.0, 0.0);
        assert!(close(first, 6.5 * 6.0 / 7.0));
        // 误差不变，微分项按 d2 衰减
        let second = pid.compute(1.0, 0.0);
        assert!(close(second, first / 7.0));
    }

    #[test]
    fn output_and_integral_are_limited() {
        let mut pid = PidController::new(0.9, 0.08, 0.0, 30.0, 200);
        pid.set_output_limits(PID_OUTPUT_MAX, PID_OUTPUT_MIN);
        for _ in 0..1_000 {
            assert!(pid.compute(100.0, 0.0) <= PID_OUTPUT_MAX);
        }
        // 积分被限制在上限，误差反向后很快退出饱和
        let out = pid.compute(0.0, 10.0);
        assert!(close(out, PID_OUTPUT_MIN));
        let out = pid.compute(0.0, 0.5);
        assert!(out > PID_OUTPUT_MIN && out < PID_OUTPUT_MAX, "{out}");
    }

    #[test]
    fn inverted_limits_mean_unlimited() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, 30.0, 200);
        pid.set_output_limits(-1.0, 1.0);
        assert!(close(pid.compute(100.0, 0.0), 100.0));
    }

    #[test]
    fn reset_clears_history() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 30.0, 200);
        pid.compute(1.0, 0.0);
        pid.reset();
        assert!(close(pid.compute(1.0, 0.0), 0.2));
    }

    #[test]
    fn lift_is_off_while_motors_stopped() {
        let mut lift = LiftController::new();
        let mut state = FlightState::new();
        state.required_height = 2.0;
        assert_eq!(lift.compute(&state), None);

        state.do_not_move = false;
        let out = lift.compute(&state).unwrap();
        assert!(out > 0.0 && out <= PID_OUTPUT_MAX);
    }
}
