//! 按键
//!
//! 遥控器的四个按键，上拉输入，按下为低电平，由主循环轮询。
use stm32f1xx_hal::gpio::{self, Input, PullUp, PB12, PB13, PB14, PB15};

use crate::input::Buttons;

/// 按键
pub struct Keys {
    land: PB12<Input<PullUp>>,
    up: PB13<Input<PullUp>>,
    down: PB14<Input<PullUp>>,
    fly_forward: PB15<Input<PullUp>>,
}

impl Keys {
    /// 初始化按键
    /// 固定引脚: PB12、PB13、PB14、PB15
    pub fn new(
        pb12: PB12,
        pb13: PB13,
        pb14: PB14,
        pb15: PB15,
        crh: &mut gpio::Cr<'B', true>,
    ) -> Self {
        Keys {
            land: pb12.into_pull_up_input(crh),
            up: pb13.into_pull_up_input(crh),
            down: pb14.into_pull_up_input(crh),
            fly_forward: pb15.into_pull_up_input(crh),
        }
    }

    /// 读取按键状态
    pub fn read(&self) -> Buttons {
        Buttons {
            land: self.land.is_low(),
            up: self.up.is_low(),
            down: self.down.is_low(),
            fly_forward: self.fly_forward.is_low(),
        }
    }
}
