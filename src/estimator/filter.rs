//! # 传感器数据预处理
//!
//! 与驱动无关的纯计算：US-100 距离帧解码、指数滑动平均、气压高度公式。

use crate::config::{
    BAROMETER_WARMUP_SAMPLES, PRESSURE_EMA_ALPHA, REFERENCE_TEMPERATURE, SEA_LEVEL_PRESSURE,
    TEMPERATURE_EMA_ALPHA, ULTRASONIC_EMA_ALPHA, ULTRASONIC_MAX_MM,
};

/// 普适气体常数 (J/(mol*K))
const GAS_CONSTANT: f32 = 8.3143;
/// 重力加速度 (m/s^2)
const GRAVITY: f32 = 9.8066;
/// 空气摩尔质量 (kg/mol)
const AIR_MOLAR_MASS: f32 = 0.0289;

/// 解码 US-100 的两字节距离应答 (mm)
///
/// 只接受 (0, 3500) mm 以内的距离。
pub fn decode_distance(msb: u8, lsb: u8) -> Option<u16> {
    let distance = u16::from_be_bytes([msb, lsb]);
    (distance > 0 && distance < ULTRASONIC_MAX_MM).then_some(distance)
}

/// 指数滑动平均
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f32,
    average: Option<f32>,
}

impl Ema {
    pub const fn new(alpha: f32) -> Self {
        Ema {
            alpha,
            average: None,
        }
    }

    /// 加入一个样本，没有历史平均值时直接采用样本
    pub fn update(&mut self, sample: f32) -> f32 {
        let average = match self.average {
            Some(old) => self.alpha * sample + (1.0 - self.alpha) * old,
            None => sample,
        };
        self.average = Some(average);
        average
    }

    pub fn reset(&mut self) {
        self.average = None;
    }

    pub fn value(&self) -> Option<f32> {
        self.average
    }
}

/// 超声波距离平滑
///
/// 无效读数使平均值失效，下一个有效读数重新开始平均。
pub struct UltrasonicFilter {
    ema: Ema,
}

impl UltrasonicFilter {
    pub const fn new() -> Self {
        UltrasonicFilter {
            ema: Ema::new(ULTRASONIC_EMA_ALPHA),
        }
    }

    /// 输入原始读数 (mm)，返回平滑后的距离 (m)
    pub fn update(&mut self, reading: Option<u16>) -> Option<f32> {
        match reading {
            Some(mm) => Some(self.ema.update(mm as f32) / 1000.0),
            None => {
                self.ema.reset();
                None
            }
        }
    }
}

impl Default for UltrasonicFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// 气压计的平滑结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BarometerSample {
    /// 气压 (Pa)
    pub pressure: f32,
    /// 温度 (°C)
    pub temperature: f32,
    /// 气压高度 (m)
    pub altitude: f32,
}

/// 气压计数据平滑与高度换算
pub struct BarometerFilter {
    warmup: u8,
    pressure: Ema,
    temperature: Ema,
}

impl BarometerFilter {
    pub const fn new() -> Self {
        BarometerFilter {
            warmup: BAROMETER_WARMUP_SAMPLES,
            pressure: Ema::new(PRESSURE_EMA_ALPHA),
            temperature: Ema::new(TEMPERATURE_EMA_ALPHA),
        }
    }

    /// 输入一次原始读数
    ///
    /// 上电后的前几次读数被丢弃；在得到第一个有效气压之前返回 None。
    pub fn update(&mut self, pressure: f32, temperature: f32) -> Option<BarometerSample> {
        if self.warmup > 0 {
            self.warmup -= 1;
            return None;
        }

        if temperature.is_finite() {
            self.temperature.update(temperature);
        }
        if pressure.is_finite() && pressure > 0.0 {
            self.pressure.update(pressure);
        }

        let pressure = self.pressure.value()?;
        Some(BarometerSample {
            pressure,
            temperature: self.temperature.value().unwrap_or(temperature),
            altitude: altitude(pressure),
        })
    }
}

impl Default for BarometerFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// 气压高度公式
pub fn altitude(pressure: f32) -> f32 {
    -(GAS_CONSTANT * REFERENCE_TEMPERATURE / (AIR_MOLAR_MASS * GRAVITY))
        * libm::logf(pressure / SEA_LEVEL_PRESSURE)
}
