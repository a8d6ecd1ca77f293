//! 遥控器固件
//!
//! 任务:
//! - `radio_rx`: 轮询无线接收，处理确认与遥测；
//! - `main_loop`: 10 ms 主循环，读取按键、发送/重发命令、刷新指示灯；
//! - `steering`: 转向电位器采样。
#![no_std]
#![no_main]

use blimp_link::{
    config::{
        CONTROLLER_TICK, POTENTIOMETER_DEFAULT_CENTRE, POTENTIOMETER_POLL,
        POTENTIOMETER_POLL_MOVING, RADIO_POLL,
    },
    hardware::{
        key::Keys,
        led::{IndicatorLeds, Led},
        nrf24l01::{self, Nrf24L01},
        potentiometer::Potentiometer,
    },
    input::InputSampler,
    link::{ControllerSession, Event},
};

use cortex_m::asm::wfi;
use defmt::{println, Debug2Format};
use rtic_monotonics::systick::prelude::*;
use stm32f1xx_hal::{gpio::PinState, prelude::*};

systick_monotonic!(Mono, 1000);

// 定义应用程序资源和任务
#[rtic::app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [USART1, USART2])]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        radio: Nrf24L01,
        session: ControllerSession,
        input: InputSampler,
    }

    #[local]
    struct Local {
        keys: Keys,
        leds: IndicatorLeds,
        potentiometer: Potentiometer,
    }

    // 初始化函数
    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        // 获取外设实例
        let mut afio = ctx.device.AFIO.constrain();
        let mut flash = ctx.device.FLASH.constrain();
        let rcc = ctx.device.RCC.constrain();

        let mut gpioa = ctx.device.GPIOA.split();
        let mut gpiob = ctx.device.GPIOB.split();

        // 初始化时钟，ADC 时钟不超过 14 MHz
        let clocks = rcc
            .cfgr
            .use_hse(8.MHz())
            .sysclk(72.MHz())
            .pclk1(36.MHz())
            .adcclk(12.MHz())
            .freeze(&mut flash.acr);
        Mono::start(ctx.core.SYST, clocks.sysclk().to_Hz());

        println!("init start ...");

        // PB3、PB4 用于 SPI1
        let (_pa15, pb3, pb4) = afio.mapr.disable_jtag(gpioa.pa15, gpiob.pb3, gpiob.pb4);

        // 指示灯，高电平点亮
        let crl = &mut gpioa.crl;
        let leds = IndicatorLeds {
            land: Led::new(gpioa.pa4.into_push_pull_output(crl).erase(), PinState::High),
            up: Led::new(gpioa.pa5.into_push_pull_output(crl).erase(), PinState::High),
            down: Led::new(gpioa.pa6.into_push_pull_output(crl).erase(), PinState::High),
            fly_forward: Led::new(gpioa.pa7.into_push_pull_output(crl).erase(), PinState::High),
        };

        // 按键
        let keys = Keys::new(
            gpiob.pb12,
            gpiob.pb13,
            gpiob.pb14,
            gpiob.pb15,
            &mut gpiob.crh,
        );

        // 转向电位器，上电位置作为中心
        let mut potentiometer =
            Potentiometer::new(ctx.device.ADC1, gpiob.pb0, &mut gpiob.crl, clocks);
        let centre = potentiometer
            .read()
            .map_or(POTENTIOMETER_DEFAULT_CENTRE, f32::from);

        // 无线通信，初始化失败时停机
        let radio = match Nrf24L01::new(nrf24l01::Config {
            spi_sck: pb3,
            spi_miso: pb4,
            spi_mosi: gpiob.pb5,
            nrf24_ce: gpiob.pb6,
            nrf24_csn: gpiob.pb7,
            crl: &mut gpiob.crl,
            spi1: ctx.device.SPI1,
            mapr: &mut afio.mapr,
            clocks,
        }) {
            Ok(radio) => radio,
            Err(err) => {
                defmt::error!("nrf24l01 init failed: {}", Debug2Format(&err));
                loop {
                    wfi();
                }
            }
        };

        let boot = Mono::now();
        let _ = radio_rx::spawn();
        let _ = main_loop::spawn();
        let _ = steering::spawn();

        println!("init end ...");
        (
            Shared {
                radio,
                session: ControllerSession::new(boot),
                input: InputSampler::new(boot, centre),
            },
            Local {
                keys,
                leds,
                potentiometer,
            },
        )
    }

    /// 无线接收
    #[task(priority = 2, shared = [radio, session])]
    async fn radio_rx(mut ctx: radio_rx::Context) {
        let mut offline = false;
        loop {
            match ctx.shared.radio.lock(|radio| radio.recv()) {
                Ok(Some(packet)) => {
                    let now = Mono::now();
                    let event = ctx.shared.session.lock(|session| session.on_packet(&packet, now));
                    match event {
                        Event::Telemetry(frame) => {
                            println!("---");
                            for line in frame.lines() {
                                println!("{=str}", line);
                            }
                            println!("+++");
                        }
                        Event::Confirmed(counter) | Event::Rejected(counter) => {
                            defmt::debug!("confirmation {=u8}", counter.get());
                        }
                        Event::Ignored => {}
                    }
                }
                Ok(None) => {}
                Err(nrf24l01::Error::Offline) => {
                    if !offline {
                        defmt::error!("nrf24l01 offline");
                    }
                    offline = true;
                }
                Err(err) => defmt::warn!("nrf24l01 recv: {}", Debug2Format(&err)),
            }
            Mono::delay(RADIO_POLL).await;
        }
    }

    /// 主循环
    ///
    /// 没有等待确认的命令时取下一条用户输入，否则检查是否需要重发。
    #[task(priority = 1, local = [keys, leds], shared = [radio, session, input])]
    async fn main_loop(mut ctx: main_loop::Context) {
        let mut next = Mono::now();

        loop {
            let now = Mono::now();
            let buttons = ctx.local.keys.read();

            let (packet, indicators) = (&mut ctx.shared.session, &mut ctx.shared.input).lock(
                |session, input| {
                    let packet = if session.awaiting_confirmation() {
                        session.poll(now)
                    } else {
                        input
                            .poll(buttons, now, session.heartbeat_due(now))
                            .and_then(|user| {
                                let cmd = session.next_command(user.id, user.value);
                                session
                                    .submit(cmd, now)
                                    .map_err(|err| defmt::warn!("submit failed: {}", err))
                                    .ok()
                            })
                    };
                    let indicators =
                        input.indicators(session.status(), session.awaiting_confirmation(), now);
                    (packet, indicators)
                },
            );

            ctx.local.leds.show(indicators);

            if let Some(packet) = packet {
                if let Err(err) = ctx.shared.radio.lock(|radio| radio.send(&packet)) {
                    defmt::error!("nrf24l01 send: {}", Debug2Format(&err));
                }
            }

            next += CONTROLLER_TICK;
            Mono::delay_until(next).await;
        }
    }

    /// 转向电位器采样
    ///
    /// 转动时加快采样，停下后才会产生转向命令。
    #[task(priority = 1, local = [potentiometer], shared = [input])]
    async fn steering(mut ctx: steering::Context) {
        loop {
            let moving = match ctx.local.potentiometer.read() {
                Some(raw) => ctx.shared.input.lock(|input| {
                    let angle = input.angle();
                    angle.sample(f32::from(raw));
                    angle.moving()
                }),
                None => {
                    defmt::warn!("potentiometer read failed");
                    false
                }
            };

            let period = if moving {
                POTENTIOMETER_POLL_MOVING
            } else {
                POTENTIOMETER_POLL
            };
            Mono::delay(period).await;
        }
    }

    /// 任务处理
    #[idle]
    fn idle(_ctx: idle::Context) -> ! {
        loop {
            wfi();
        }
    }
}
