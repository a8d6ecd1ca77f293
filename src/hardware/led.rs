//! LED 灯

use stm32f1xx_hal::gpio::{ErasedPin, Output, PinState};

use crate::input::Indicators;

/// LED 灯
pub struct Led {
    pin: ErasedPin<Output>,
    /// 点亮时的电平
    active: PinState,
}

impl Led {
    /// 初始化 LED 灯，默认熄灭
    ///
    /// 板载 PC13 为低电平点亮，外接的指示灯为高电平点亮。
    pub fn new(pin: ErasedPin<Output>, active: PinState) -> Self {
        let mut led = Led { pin, active };
        led.off();
        led
    }

    /// 开启 LED 灯
    pub fn on(&mut self) {
        self.set(true);
    }

    /// 关闭 LED 灯
    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn set(&mut self, lit: bool) {
        let level = match (lit, self.active) {
            (true, PinState::High) | (false, PinState::Low) => PinState::High,
            _ => PinState::Low,
        };
        match level {
            PinState::High => self.pin.set_high(),
            PinState::Low => self.pin.set_low(),
        }
    }
}

/// 遥控器上的四个指示灯
pub struct IndicatorLeds {
    pub land: Led,
    pub up: Led,
    pub down: Led,
    pub fly_forward: Led,
}

impl IndicatorLeds {
    pub fn show(&mut self, indicators: Indicators) {
        self.land.set(indicators.land);
        self.up.set(indicators.up);
        self.down.set(indicators.down);
        self.fly_forward.set(indicators.fly_forward);
    }
}
