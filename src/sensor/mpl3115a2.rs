//! # MPL3115A2 气压计
//!
//! I2C 接口的气压/温度传感器，这里工作在气压计模式（不使用芯片内部的高度换算），
//! 高度由 [`crate::estimator::filter::altitude`] 按海平面气压计算。
//!
//! 数据寄存器 0x01~0x05: 气压 20 位无符号定点数（18 位整数 + 2 位小数，单位 Pa），
//! 温度 12 位有符号定点数（8 位整数 + 4 位小数，单位 °C）。

/// 7 位从机地址
pub const ADDRESS: u8 = 0x60;

/// 数据就绪状态
pub const REG_STATUS: u8 = 0x00;
/// 气压数据起始寄存器
pub const REG_OUT_P_MSB: u8 = 0x01;
/// 芯片 ID
pub const REG_WHO_AM_I: u8 = 0x0C;
/// 数据就绪事件
pub const REG_PT_DATA_CFG: u8 = 0x13;
/// 控制寄存器 1
pub const REG_CTRL_REG1: u8 = 0x26;

/// WHO_AM_I 的固定值
pub const DEVICE_ID: u8 = 0xC4;
/// 过采样 128，气压计模式，待机
pub const CTRL_OS128: u8 = 0x38;
/// 激活
pub const CTRL_ACTIVE: u8 = 0x01;
/// 气压、温度数据就绪事件全部使能
pub const PT_DATA_EVENTS: u8 = 0x07;
/// STATUS 中的气压/温度数据就绪位
pub const STATUS_PTDR: u8 = 0x08;

/// 解析 OUT_P_MSB..OUT_T_LSB 五个字节
///
/// 返回 (气压 Pa, 温度 °C)。
pub fn decode(raw: &[u8; 5]) -> (f32, f32) {
    let pressure = ((raw[0] as u32) << 16 | (raw[1] as u32) << 8 | raw[2] as u32) >> 4;
    let temperature = i16::from_be_bytes([raw[3], raw[4]]) >> 4;
    (pressure as f32 / 4.0, temperature as f32 / 16.0)
}

#[cfg(feature = "firmware")]
pub use driver::*;

#[cfg(feature = "firmware")]
mod driver {
    use embedded_hal::blocking::i2c::{Write, WriteRead};
    use stm32f1xx_hal::{
        gpio::{self, Alternate, OpenDrain, PB10, PB11},
        i2c::{self, BlockingI2c, DutyCycle},
        pac::I2C2,
        prelude::_fugit_RateExtU32,
        rcc::Clocks,
    };

    use super::*;

    type I2cTy = BlockingI2c<I2C2, (PB10<Alternate<OpenDrain>>, PB11<Alternate<OpenDrain>>)>;

    /// MPL3115A2 气压计
    pub struct Mpl3115a2 {
        i2c: I2cTy,
    }

    impl Mpl3115a2 {
        /// 初始化 I2C2 并配置为连续测量的气压计模式
        /// 固定引脚: PB10、PB11
        pub fn new(
            i2c2: I2C2,
            pb10: PB10,
            pb11: PB11,
            crh: &mut gpio::Cr<'B', true>,
            clocks: Clocks,
        ) -> Result<Self, i2c::Error> {
            let scl = pb10.into_alternate_open_drain(crh);
            let sda = pb11.into_alternate_open_drain(crh);

            let i2c = BlockingI2c::i2c2(
                i2c2,
                (scl, sda),
                i2c::Mode::fast(100.kHz(), DutyCycle::Ratio2to1),
                clocks,
                1000, // 发启动信号的超时时间，单位是微妙
                10,   // 启动信号的重试次数
                1000, // 地址信号的超时时间，单位是微秒
                1000, // 数据信号的超时时间，单位是微妙
            );

            let mut sensor = Mpl3115a2 { i2c };
            sensor.init_config()?;
            Ok(sensor)
        }

        fn init_config(&mut self) -> Result<(), i2c::Error> {
            let mut id = [0u8];
            self.i2c.write_read(ADDRESS, &[REG_WHO_AM_I], &mut id)?;
            if id[0] != DEVICE_ID {
                defmt::warn!("mpl3115a2: unexpected id {=u8:#x}", id[0]);
            }

            self.i2c.write(ADDRESS, &[REG_CTRL_REG1, CTRL_OS128])?;
            self.i2c.write(ADDRESS, &[REG_PT_DATA_CFG, PT_DATA_EVENTS])?;
            self.i2c
                .write(ADDRESS, &[REG_CTRL_REG1, CTRL_OS128 | CTRL_ACTIVE])?;
            Ok(())
        }

        /// 读取一次气压与温度
        ///
        /// 数据尚未就绪时返回 None。
        pub fn read(&mut self) -> Result<Option<(f32, f32)>, i2c::Error> {
            let mut status = [0u8];
            self.i2c.write_read(ADDRESS, &[REG_STATUS], &mut status)?;
            if status[0] & STATUS_PTDR == 0 {
                return Ok(None);
            }

            let mut raw = [0u8; 5];
            self.i2c.write_read(ADDRESS, &[REG_OUT_P_MSB], &mut raw)?;
            Ok(Some(decode(&raw)))
        }
    }
}
