//! 电调与舵机
//!
//! TIM3 四路 50 Hz PWM:
//! - C1 (PA6)、C2 (PA7): 两个升力电机的双向电调，1500 us 停转；
//! - C3 (PB0): 前进电机电调；
//! - C4 (PB1): 转向舵机。

use stm32f1xx_hal::{
    afio::MAPR,
    gpio::{self, Alternate, PA6, PA7, PB0, PB1},
    pac::TIM3,
    prelude::_fugit_RateExtU32,
    rcc::Clocks,
    timer::{Ch, Channel, PwmExt, PwmHz, Tim3NoRemap},
};

use crate::{
    actuator::Pulses,
    config::{PWM_FREQUENCY_HZ, PWM_PERIOD_US},
};

/// 配置
pub struct Config<'a> {
    pub pa6: PA6,
    pub pa7: PA7,
    pub pb0: PB0,
    pub pb1: PB1,
    pub crla: &'a mut gpio::Cr<'A', false>,
    pub crlb: &'a mut gpio::Cr<'B', false>,
    pub tim3: TIM3,
    pub mapr: &'a mut MAPR,
    pub clocks: &'a Clocks,
}

// pwm 类型别名
type PwmTy = PwmHz<
    TIM3,
    Tim3NoRemap,
    (Ch<0>, Ch<1>, Ch<2>, Ch<3>),
    (
        PA6<Alternate>,
        PA7<Alternate>,
        PB0<Alternate>,
        PB1<Alternate>,
    ),
>;

pub struct Esc {
    pwm: PwmTy,
    max_duty: u16,
}

impl Esc {
    /// 创建对象，输出上电安全脉宽
    pub fn new(config: Config) -> Self {
        let lift1 = config.pa6.into_alternate_push_pull(config.crla);
        let lift2 = config.pa7.into_alternate_push_pull(config.crla);
        let forward = config.pb0.into_alternate_push_pull(config.crlb);
        let servo = config.pb1.into_alternate_push_pull(config.crlb);

        let mut pwm = config.tim3.pwm_hz::<Tim3NoRemap, _, _>(
            (lift1, lift2, forward, servo),
            config.mapr,
            PWM_FREQUENCY_HZ.Hz(),
            config.clocks,
        );

        pwm.enable(Channel::C1);
        pwm.enable(Channel::C2);
        pwm.enable(Channel::C3);
        pwm.enable(Channel::C4);

        // 获取最大占空比
        let max_duty = pwm.get_max_duty();

        let mut esc = Esc { pwm, max_duty };
        esc.apply(Pulses::IDLE);
        esc
    }

    /// 输出一组脉宽
    pub fn apply(&mut self, pulses: Pulses) {
        self.set_pulse(Channel::C1, pulses.lift);
        self.set_pulse(Channel::C2, pulses.lift);
        self.set_pulse(Channel::C3, pulses.forward);
        self.set_pulse(Channel::C4, pulses.servo);
    }

    /// 按脉宽 (us) 设置占空比
    fn set_pulse(&mut self, channel: Channel, pulse_us: u16) {
        let duty = self.max_duty as u32 * pulse_us as u32 / PWM_PERIOD_US;
        self.pwm.set_duty(channel, duty as u16);
    }
}
