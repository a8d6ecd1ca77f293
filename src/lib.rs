//! # 飞艇遥控链路与高度控制
//!
//! 飞艇（airship）与地面遥控器（controller）共用的核心逻辑：
//! - 基于奇偶校验的无线数据包编解码
//! - 遥控器端的发送/重发/确认会话，飞艇端的校验/去重会话
//! - 超声波与气压计融合的高度估计
//! - 目标高度状态机与 PID 升力控制
//!
//! 核心部分与硬件无关，可在主机上测试；板级支持在 `firmware` 特性下编译。
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod actuator;
pub mod config;
pub mod estimator;
pub mod flight;
pub mod input;
pub mod link;
pub mod pid;
pub mod protocol;
pub mod radio;
pub mod sensor;
pub mod time;

#[cfg(feature = "firmware")]
pub mod hardware;

// 日志输出
#[cfg(feature = "firmware")]
use defmt_rtt as _;
#[cfg(feature = "firmware")]
use panic_probe as _;
// 中断向量表
#[cfg(feature = "firmware")]
use stm32f1xx_hal as _;

// 引脚校验
// 备注*的引脚尽量不替换
#[allow(unused)]
enum _AirshipPin {
    // 信号灯
    PC13,

    // NRF24L01 无线通信
    PB3, // 复用引脚
    PB4, // 复用引脚
    PB5, // *
    PB6,
    PB7,

    // MPL3115A2 气压计
    PB10, // *
    PB11, // *

    // US-100 超声波测距 (USART2)
    PA2, // *
    PA3, // *

    // 电调与舵机 PWM (TIM3: 升力电机1、升力电机2、前进电机、舵机)
    PA6, // *
    PA7, // *
    PB0, // *
    PB1, // *

    // 不可使用引脚, 需要重置才可使用
    PB2,
    PA13,
    PA14,
}

#[allow(unused)]
enum _ControllerPin {
    // 指示灯: LAND、UP、DOWN、FLY_FORWARD
    PA4,
    PA5,
    PA6,
    PA7,

    // 按键: LAND、UP、DOWN、FLY_FORWARD
    PB12,
    PB13,
    PB14,
    PB15,

    // 转向电位器 (ADC1 通道 8)
    PB0, // *

    // NRF24L01 无线通信
    PB3, // 复用引脚
    PB4, // 复用引脚
    PB5, // *
    PB6,
    PB7,

    // 不可使用引脚, 需要重置才可使用
    PB2,
    PA13,
    PA14,
}
