//! # US-100 超声波测距
//!
//! 串口模式 (9600 8N1): 发送 0x55 触发一次测距，模块回复两个字节的距离 (mm)，高位在前。

use crate::estimator::filter::decode_distance;

/// 触发测距的指令
pub const TRIGGER: u8 = 0x55;

/// 应答拼接
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    msb: Option<u8>,
}

impl Reply {
    pub const fn new() -> Self {
        Reply { msb: None }
    }

    /// 放入一个字节，收齐两个字节后返回有效距离或 `Some(None)`
    pub fn push(&mut self, byte: u8) -> Option<Option<u16>> {
        match self.msb.take() {
            None => {
                self.msb = Some(byte);
                None
            }
            Some(msb) => Some(decode_distance(msb, byte)),
        }
    }
}

#[cfg(feature = "firmware")]
pub use driver::*;

#[cfg(feature = "firmware")]
mod driver {
    use nb::block;
    use stm32f1xx_hal::{
        afio::MAPR,
        gpio::{self, PA2, PA3},
        pac::USART2,
        rcc::Clocks,
        serial::{self, Rx, Serial, StopBits, Tx},
        time::U32Ext,
    };
    use unwrap_infallible::UnwrapInfallible;

    use super::*;

    /// US-100 超声波模块
    pub struct Us100 {
        tx: Tx<USART2>,
        rx: Rx<USART2>,
        reply: Reply,
    }

    impl Us100 {
        /// 初始化 USART2 串口
        /// 固定引脚: PA2、PA3
        pub fn new(
            pa2: PA2,
            pa3: PA3,
            crl: &mut gpio::Cr<'A', false>,
            usart2: USART2,
            mapr: &mut MAPR,
            clocks: &Clocks,
        ) -> Self {
            let tx = pa2.into_alternate_push_pull(crl);
            let rx = pa3;

            let (tx, rx) = Serial::new(
                usart2,
                (tx, rx),
                mapr,
                serial::Config::default()
                    .baudrate(9600.bps())
                    .wordlength_8bits()
                    .stopbits(StopBits::STOP1)
                    .parity_none(),
                clocks,
            )
            .split();

            Us100 {
                tx,
                rx,
                reply: Reply::new(),
            }
        }

        /// 触发一次测距
        ///
        /// 丢弃上一次没有读完的应答。
        pub fn trigger(&mut self) {
            while self.rx.read().is_ok() {}
            self.reply = Reply::new();
            block!(self.tx.write(TRIGGER)).unwrap_infallible();
        }

        /// 非阻塞读取应答
        ///
        /// 收齐两个字节前返回 `WouldBlock`；距离无效时返回 `Ok(None)`。
        pub fn poll(&mut self) -> nb::Result<Option<u16>, serial::Error> {
            loop {
                let byte = self.rx.read()?;
                if let Some(distance) = self.reply.push(byte) {
                    return Ok(distance);
                }
            }
        }
    }
}
