//! 转向电位器
//!
//! ADC1 通道 8 (PB0)，每次读数取 5 次采样的中位数。

use embedded_hal::adc::OneShot;
use nb::block;
use stm32f1xx_hal::{
    adc::Adc,
    gpio::{self, Analog, PB0},
    pac::ADC1,
    rcc::Clocks,
};

use crate::input::reject_outliers;

/// 每次读数的采样次数
const SAMPLES: usize = 5;

/// 转向电位器
pub struct Potentiometer {
    adc: Adc<ADC1>,
    pin: PB0<Analog>,
}

impl Potentiometer {
    /// 初始化 ADC1
    /// 固定引脚: PB0
    pub fn new(adc1: ADC1, pb0: PB0, crl: &mut gpio::Cr<'B', false>, clocks: Clocks) -> Self {
        Potentiometer {
            adc: Adc::adc1(adc1, clocks),
            pin: pb0.into_analog(crl),
        }
    }

    /// 读取 ADC 值
    pub fn read(&mut self) -> Option<u16> {
        let mut samples = [0u16; SAMPLES];
        for sample in samples.iter_mut() {
            let value: u16 = block!(self.adc.read(&mut self.pin)).ok()?;
            *sample = value;
        }
        Some(reject_outliers(samples))
    }
}
