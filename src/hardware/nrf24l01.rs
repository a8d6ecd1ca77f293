//! NRF24L01 SPI - 2.4 GHz 无线通信
//!
//! 固定 32 字节载荷，关闭 CRC、自动应答与自动重传，校验与重发由链路层负责。
//! 空闲时保持接收模式，发送时临时切换到发送模式，发送完成后回到接收模式。
//! 模式切换失败时保留设备，下一次收发前重新上电进入接收模式。

use core::convert::Infallible;

use embedded_nrf24l01::{Configuration, CrcMode, DataRate, RxMode, StandbyMode, NRF24L01};
use stm32f1xx_hal::{
    afio::MAPR,
    gpio::{self, Alternate, Input, Output, PullUp, PushPull, PB3, PB4, PB5, PB6, PB7},
    pac::SPI1,
    prelude::_fugit_RateExtU32,
    rcc::Clocks,
    spi::{self, Spi, Spi1Remap},
};

use crate::{
    config::{NRF24L01_CHANNEL, NRF24L01_RX_ADDR, NRF24L01_RX_ADDR_P0, NRF24L01_TX_ADDR},
    protocol::{Packet, MAX_PACKET_LEN},
    radio::RadioMode,
};

type Device = NRF24L01<
    Infallible,
    PB6<Output<PushPull>>,
    PB7<Output<PushPull>>,
    Spi<SPI1, Spi1Remap, (PB3<Alternate>, PB4<Input<PullUp>>, PB5<Alternate>), u8>,
>;

/// 设备错误
pub type DeviceError = embedded_nrf24l01::Error<spi::Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nrf24l01 device error: {0:?}")]
    Device(DeviceError),
    /// 设备在模式切换中丢失，只能复位
    #[error("nrf24l01 offline")]
    Offline,
}

/// 配置参数
/// PB3、PB4 需要先关闭 JTAG 才能使用
pub struct Config<'a> {
    pub spi_sck: PB3,
    pub spi_miso: PB4,
    pub spi_mosi: PB5,
    pub nrf24_ce: PB6,
    pub nrf24_csn: PB7,
    pub crl: &'a mut gpio::Cr<'B', false>,
    pub spi1: SPI1,
    pub mapr: &'a mut MAPR,
    pub clocks: Clocks,
}

/// NRF24L01 2.4G 无线通信
pub struct Nrf24L01 {
    mode: RadioMode<RxMode<Device>, Device>,
}

impl Nrf24L01 {
    /// 初始化 NRF24L01 SPI 2.4 GHz 无线通信，进入接收模式
    pub fn new(config: Config) -> Result<Self, Error> {
        // 创建一个SPI实例
        let spi = {
            let sck = config.spi_sck.into_alternate_push_pull(config.crl);
            let miso = config.spi_miso.into_pull_up_input(config.crl);
            let mosi = config.spi_mosi.into_alternate_push_pull(config.crl);

            let mode = spi::Mode {
                polarity: spi::Polarity::IdleLow,
                phase: spi::Phase::CaptureOnFirstTransition,
            };

            Spi::spi1(
                config.spi1,
                (sck, miso, mosi),
                config.mapr,
                mode,
                1.MHz(),
                config.clocks,
            )
        };

        let ce = config.nrf24_ce.into_push_pull_output(config.crl);
        let csn = config.nrf24_csn.into_push_pull_output(config.crl);

        let mut nrf24 = NRF24L01::new(ce, csn, spi)?;
        Self::init_config(&mut nrf24)?;

        let rx = nrf24.rx().map_err(|(_, err)| err)?;
        Ok(Nrf24L01 {
            mode: RadioMode::Rx(rx),
        })
    }

    /// 配置设备
    fn init_config(nrf24: &mut StandbyMode<Device>) -> Result<(), DeviceError> {
        // 设置频率为 2.476 GHz
        nrf24.set_frequency(NRF24L01_CHANNEL)?;
        // 通信速率 250 kbps，输出功率 0 dBm
        // * `00`: -18 dBm
        // * `01`: -12 dBm
        // * `10`: -6 dBm
        // * `11`: 0 dBm
        nrf24.set_rf(&DataRate::R250Kbps, 0b11)?;
        // 关闭自动重传功能
        nrf24.set_auto_retransmit(0, 0)?;
        // 设置CRC模式
        nrf24.set_crc(CrcMode::Disabled)?;
        // 关闭自动应答功能
        nrf24.set_auto_ack(&[false; 6])?;
        // 只使用管道0，固定载荷长度
        nrf24.set_pipes_rx_enable(&[true, false, false, false, false, false])?;
        nrf24.set_pipes_rx_lengths(&[Some(MAX_PACKET_LEN as u8); 6])?;

        // 设置发送地址
        nrf24.set_tx_addr(NRF24L01_TX_ADDR)?;
        // 设置接收地址
        nrf24.set_rx_addr(NRF24L01_RX_ADDR_P0, NRF24L01_RX_ADDR)?;

        // 清空发送缓冲区
        nrf24.flush_tx()?;
        // 清空接收缓冲区
        nrf24.flush_rx()?;
        Ok(())
    }

    /// 取出一个接收到的数据包
    pub fn recv(&mut self) -> Result<Option<Packet>, Error> {
        let rx = self.rx()?;
        if rx.can_read()?.is_none() {
            return Ok(None);
        }
        let payload = rx.read()?;
        // 载荷不超过 32 字节
        Ok(Packet::from_slice(payload.as_ref()).ok())
    }

    /// 发送一个数据包，不足 32 字节以 0 填充
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.rx()?;
        let rx = self.mode.take_rx().ok_or(Error::Offline)?;

        let mut payload = [0u8; MAX_PACKET_LEN];
        let len = bytes.len().min(MAX_PACKET_LEN);
        payload[..len].copy_from_slice(&bytes[..len]);

        let mut tx = match rx.standby().tx() {
            Ok(tx) => tx,
            Err((device, err)) => {
                self.mode.park(device);
                return Err(err.into());
            }
        };
        // 发送失败也要先清空队列再回到接收模式
        let sent = tx.send(&payload).and_then(|_| tx.wait_empty());
        if sent.is_err() {
            tx.flush_tx().ok();
        }
        // 队列已空，这里只剩一次状态读取
        let standby = tx.standby()?;
        match standby.rx() {
            Ok(rx) => self.mode.resume(rx),
            Err((device, err)) => {
                self.mode.park(device);
                return Err(err.into());
            }
        }
        sent.map_err(Error::from)
    }

    /// 接收模式下的设备，必要时重新上电进入接收模式
    fn rx(&mut self) -> Result<&mut RxMode<Device>, Error> {
        self.mode
            .rx(|device| StandbyMode::power_up(device)?.rx())?
            .ok_or(Error::Offline)
    }
}
