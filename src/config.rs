//! 全局配置

use crate::{pid::Derivative, time::Duration};

/// 飞艇地址
pub const AIRSHIP_ADDRESS: u8 = 0x11;
/// 遥控器地址
pub const CONTROLLER_ADDRESS: u8 = 0xBB;

/// 遥控器重发间隔
pub const RETRY_INTERVAL: Duration = Duration::millis(500);
/// 心跳间隔，超过此时间没有发送任何数据就发送 SAY_HI
pub const HEARTBEAT_INTERVAL: Duration = Duration::millis(5400);
/// 按键防抖间隔
pub const BUTTON_INTERVAL: Duration = Duration::millis(800);

/// 失联自动降落时间
pub const EMERGENCY_PERIOD: Duration = Duration::millis(50_000);
/// 控制循环周期
pub const CONTROL_TICK: Duration = Duration::millis(100);
/// 遥控器主循环周期
pub const CONTROLLER_TICK: Duration = Duration::millis(10);
/// 无线接收轮询间隔
pub const RADIO_POLL: Duration = Duration::millis(5);
/// 遥测数据发送间隔
pub const TELEMETRY_INTERVAL: Duration = Duration::millis(700);
/// 信号灯亮灯时长
pub const SIGNAL_LED_ON: Duration = Duration::millis(500);
/// 信号灯周期
pub const SIGNAL_LED_PERIOD: Duration = Duration::millis(1500);

/// PID 采样周期，单位 ms
pub const PID_SAMPLE_TIME_MS: u32 = 200;
/// 比例系数
pub const PID_KP: f32 = 0.9;
/// 积分系数
pub const PID_KI: f32 = 0.08;
/// 微分系数
pub const PID_KD: f32 = 1.3;
/// 微分滤波系数，只用于滤波形式的微分项
pub const PID_N: f32 = 30.0;
/// 升力控制的微分项形式
pub const PID_DERIVATIVE: Derivative = Derivative::Classic;
/// PID 输出上限（升力，N）
pub const PID_OUTPUT_MAX: f32 = 3.5596;
/// PID 输出下限（升力，N）
pub const PID_OUTPUT_MIN: f32 = -1.9945;

/// 超声波有效性窗口长度
pub const VALIDITY_WINDOW: usize = 40;
/// 窗口初始的无效样本数，其余为有效
pub const VALIDITY_INITIAL_INVALID: usize = 10;

/// US-100 有效测距范围 (0, 3500) mm
pub const ULTRASONIC_MAX_MM: u16 = 3500;
/// 超声波距离 EMA 权重
pub const ULTRASONIC_EMA_ALPHA: f32 = 0.4;
/// 超声波轮询间隔
pub const ULTRASONIC_POLL: Duration = Duration::millis(10);
/// 超声波应答超时
pub const ULTRASONIC_TIMEOUT: Duration = Duration::millis(500);

/// 海平面气压 (Pa)
pub const SEA_LEVEL_PRESSURE: f32 = 102_630.0;
/// 气压高度公式使用的温度 (K)
pub const REFERENCE_TEMPERATURE: f32 = 273.15 + 15.0;
/// 气压 EMA 权重
pub const PRESSURE_EMA_ALPHA: f32 = 0.15;
/// 温度 EMA 权重
pub const TEMPERATURE_EMA_ALPHA: f32 = 0.2;
/// 上电后丢弃的气压计读数个数
pub const BAROMETER_WARMUP_SAMPLES: u8 = 7;
/// 气压计轮询间隔
pub const BAROMETER_POLL: Duration = Duration::millis(256);

/// 降落目标高度（高空段）
pub const LANDING_HIGH_TARGET: f32 = 0.5;
/// 降落目标高度（低空段）
pub const LANDING_LOW_TARGET: f32 = 0.05;
/// 降落分段高度
pub const LANDING_BAND_SPLIT: f32 = 1.0;
/// 高空段目标的容差
pub const LANDING_HIGH_TOLERANCE: f32 = 0.1;
/// 低空段目标的容差
pub const LANDING_LOW_TOLERANCE: f32 = 0.01;
/// 判定着陆的高度
pub const TOUCHDOWN_HEIGHT: f32 = 0.1;
/// 判定着陆所需的超声波有效率
pub const TOUCHDOWN_VALIDITY: f32 = 0.85;
/// 超声波重新有效时允许平滑目标高度的最大有效率
pub const REACQUISITION_VALIDITY: f32 = 0.4;
/// 平滑后目标高度的下限
pub const MIN_REQUIRED_HEIGHT: f32 = 0.5;

/// 转向电位器命令的最大角度
pub const MAX_STEERING_ANGLE: f32 = 270.0;
/// 电位器角度限幅
pub const POTENTIOMETER_LIMIT: f32 = 90.0;
/// 触发新转向命令的最小角度变化
pub const POTENTIOMETER_STEP: f32 = 5.0;
/// 判定电位器正在转动的角度变化
pub const POTENTIOMETER_MOVING: f32 = 2.0;
/// 电位器线性标定斜率
pub const POTENTIOMETER_K: f32 = 3.91;
/// 电位器线性标定截距
pub const POTENTIOMETER_Q: f32 = -8.91;
/// 电位器轮询间隔
pub const POTENTIOMETER_POLL: Duration = Duration::millis(100);
/// 电位器转动时的轮询间隔
pub const POTENTIOMETER_POLL_MOVING: Duration = Duration::millis(15);
/// 上电读取失败时使用的中心位置 (12 位 ADC 中点)
pub const POTENTIOMETER_DEFAULT_CENTRE: f32 = 2048.0;
/// 前进电机最大功率
pub const MAX_MOTOR_POWER: i32 = 180;
/// 前进电机默认功率
pub const DEFAULT_MOTOR_POWER: i32 = 110;

/// 电调与舵机的 PWM 频率 (Hz)
pub const PWM_FREQUENCY_HZ: u32 = 50;
/// PWM 周期 (us)
pub const PWM_PERIOD_US: u32 = 1_000_000 / PWM_FREQUENCY_HZ;
/// 最小脉宽 (us)
pub const PULSE_MIN_US: u16 = 1000;
/// 中位脉宽 (us)，双向电调停转
pub const PULSE_NEUTRAL_US: u16 = 1500;
/// 最大脉宽 (us)
pub const PULSE_MAX_US: u16 = 2000;
/// 舵机行程 (°)
pub const SERVO_RANGE: i32 = 180;

/// RF24L01 通信频道, 2.4 GHz + 76 MHz
pub const NRF24L01_CHANNEL: u8 = 76;
/// RF24L01 发送协议地址
pub const NRF24L01_TX_ADDR: &[u8] = b"blimp";
/// RF24L01 接收协议地址
pub const NRF24L01_RX_ADDR: &[u8] = b"blimp";
pub const NRF24L01_RX_ADDR_P0: usize = 0;
