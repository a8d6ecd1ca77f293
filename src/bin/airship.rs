//! 飞艇固件
//!
//! 任务:
//! - `radio_rx`: 轮询无线接收，校验、去重后把命令交给控制循环；
//! - `control`: 100 ms 控制循环，高度融合、状态机、确认与遥测；
//! - `sample_ultrasonic` / `sample_barometer`: 传感器采样；
//! - `lift`: PID 升力控制与电调、舵机输出；
//! - `blink`: 信号灯。
#![no_std]
#![no_main]

use blimp_link::{
    actuator::Pulses,
    config::{
        BAROMETER_POLL, CONTROL_TICK, PID_SAMPLE_TIME_MS, RADIO_POLL, SIGNAL_LED_ON,
        SIGNAL_LED_PERIOD, TELEMETRY_INTERVAL, ULTRASONIC_POLL, ULTRASONIC_TIMEOUT,
    },
    estimator::{
        filter::{BarometerFilter, BarometerSample, UltrasonicFilter},
        HeightEstimate, HeightEstimator, ValidityEstimator,
    },
    flight::{FlightController, FlightState},
    hardware::{
        esc::{self, Esc},
        led::Led,
        nrf24l01::{self, Nrf24L01},
    },
    link::{AirshipSession, Inbound, Reception},
    pid::LiftController,
    protocol::{self, packet::encode_measured_data, telemetry::Telemetry, Packet},
    sensor::{mpl3115a2::Mpl3115a2, us100::Us100},
    time::{elapsed, Duration},
};

use cortex_m::asm::wfi;
use defmt::{println, Debug2Format};
use rtic_monotonics::systick::prelude::*;
use rtic_sync::{
    channel::{Receiver, Sender},
    make_channel,
};
use stm32f1xx_hal::{gpio::PinState, prelude::*};

systick_monotonic!(Mono, 1000);

// 入站命令通道
const INBOUND_CAPACITY: usize = 4;

// 定义应用程序资源和任务
#[rtic::app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [USART1, USART3])]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        radio: Nrf24L01,
        session: AirshipSession,
        /// 控制循环每个周期提交的状态快照
        flight: FlightState,
        /// 滤波后的超声波距离 (m)
        ultrasonic: Option<f32>,
        barometer: Option<BarometerSample>,
        validity: f32,
        /// 升力控制输出 (N)
        power: f32,
    }

    #[local]
    struct Local {
        signal: Led,
        us100: Us100,
        mpl3115a2: Option<Mpl3115a2>,
        esc: Esc,
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
        let mut gpioc = ctx.device.GPIOC.split();

        // 初始化时钟
        let clocks = rcc
            .cfgr
            .use_hse(8.MHz())
            .sysclk(72.MHz())
            .pclk1(36.MHz())
            .freeze(&mut flash.acr);
        Mono::start(ctx.core.SYST, clocks.sysclk().to_Hz());

        println!("init start ...");

        // PB3、PB4 用于 SPI1
        let (_pa15, pb3, pb4) = afio.mapr.disable_jtag(gpioa.pa15, gpiob.pb3, gpiob.pb4);

        // 信号灯，低电平点亮
        let signal = Led::new(
            gpioc.pc13.into_push_pull_output(&mut gpioc.crh).erase(),
            PinState::Low,
        );

        // 电调与舵机，先输出停转脉宽
        let esc = Esc::new(esc::Config {
            pa6: gpioa.pa6,
            pa7: gpioa.pa7,
            pb0: gpiob.pb0,
            pb1: gpiob.pb1,
            crla: &mut gpioa.crl,
            crlb: &mut gpiob.crl,
            tim3: ctx.device.TIM3,
            mapr: &mut afio.mapr,
            clocks: &clocks,
        });

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

        // 超声波测距
        let us100 = Us100::new(
            gpioa.pa2,
            gpioa.pa3,
            &mut gpioa.crl,
            ctx.device.USART2,
            &mut afio.mapr,
            &clocks,
        );

        // 气压计，失败时只用超声波
        let mpl3115a2 = Mpl3115a2::new(
            ctx.device.I2C2,
            gpiob.pb10,
            gpiob.pb11,
            &mut gpiob.crh,
            clocks,
        )
        .map_err(|err| defmt::error!("mpl3115a2 init failed: {}", Debug2Format(&err)))
        .ok();

        let (inbound_s, inbound_r) = make_channel!(Inbound, INBOUND_CAPACITY);
        let _ = radio_rx::spawn(inbound_s);
        let _ = control::spawn(inbound_r, mpl3115a2.is_some());
        let _ = sample_ultrasonic::spawn();
        let _ = sample_barometer::spawn();
        let _ = lift::spawn();
        let _ = blink::spawn();

        println!("init end ...");
        (
            Shared {
                radio,
                session: AirshipSession::new(),
                flight: FlightState::new(),
                ultrasonic: None,
                barometer: None,
                validity: ValidityEstimator::new().rate(),
                power: 0.0,
            },
            Local {
                signal,
                us100,
                mpl3115a2,
                esc,
            },
        )
    }

    /// 无线接收
    ///
    /// 重复的命令立即重发上一次的确认，其余命令交给控制循环。
    #[task(priority = 2, shared = [radio, session, flight])]
    async fn radio_rx(
        mut ctx: radio_rx::Context,
        mut inbound: Sender<'static, Inbound, INBOUND_CAPACITY>,
    ) {
        let mut offline = false;
        loop {
            match ctx.shared.radio.lock(|radio| radio.recv()) {
                Ok(Some(packet)) => {
                    let now = Mono::now();
                    match ctx.shared.session.lock(|session| session.receive(&packet, now)) {
                        Reception::Ignored | Reception::Heartbeat => {}
                        Reception::Duplicate => {
                            let flags = ctx.shared.flight.lock(|flight| flight.flags());
                            let reply = ctx
                                .shared
                                .session
                                .lock(|session| session.duplicate_reply(flags));
                            transmit(&mut ctx.shared.radio, reply);
                        }
                        Reception::Command(cmd) => {
                            // 没有确认的命令在重发时重新处理
                            if inbound.try_send(cmd).is_err() {
                                defmt::warn!("inbound queue full, command dropped");
                            }
                        }
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

    /// 控制循环
    #[task(priority = 1, shared = [radio, session, flight, ultrasonic, barometer, validity, power])]
    async fn control(
        mut ctx: control::Context,
        mut inbound: Receiver<'static, Inbound, INBOUND_CAPACITY>,
        barometer_online: bool,
    ) {
        let mut controller = FlightController::new();
        let mut estimator = HeightEstimator::new();
        let mut telemetry_line = 0;
        let mut last_telemetry = Mono::now();
        let mut next = Mono::now();

        loop {
            let now = Mono::now();
            let ultrasonic = ctx.shared.ultrasonic.lock(|ultrasonic| *ultrasonic);
            let barometer = ctx.shared.barometer.lock(|barometer| *barometer);
            let validity = ctx.shared.validity.lock(|validity| *validity);
            let link_lost = ctx.shared.session.lock(|session| session.link_lost(now));

            // 没有气压计时高度保持最近一次的超声波读数；
            // 气压计预热期间不标定偏移量
            let altitude = match barometer {
                Some(sample) => Some(sample.altitude),
                None if !barometer_online => Some(0.0),
                None => None,
            };
            let estimate = match altitude {
                Some(altitude) => estimator.update(ultrasonic, altitude),
                None => HeightEstimate {
                    height: ultrasonic.unwrap_or(controller.state().current_height),
                    ultrasonic_valid: ultrasonic.is_some(),
                },
            };
            controller.tick(estimate, validity, link_lost);

            // 每个周期最多处理一条命令
            if let Ok(cmd) = inbound.try_recv() {
                if let Ok(valid) = cmd.outcome {
                    controller.process(valid);
                }
                let flags = controller.state().flags();
                let reply = ctx.shared.session.lock(|session| session.confirm(&cmd, flags));
                transmit(&mut ctx.shared.radio, reply);
            } else if elapsed(now, last_telemetry) >= TELEMETRY_INTERVAL {
                last_telemetry = now;
                let state = controller.state();
                let sample = barometer.unwrap_or_default();
                let telemetry = Telemetry {
                    current_height: state.current_height,
                    required_height: state.required_height,
                    temperature: sample.temperature,
                    pressure: sample.pressure,
                    altitude: sample.altitude,
                    power: ctx.shared.power.lock(|power| *power),
                    validity_rate: validity,
                };
                let (frame, next_line) = telemetry.frame(telemetry_line);
                telemetry_line = next_line;
                transmit(&mut ctx.shared.radio, encode_measured_data(state.flags(), &frame));
            }

            // 提交状态快照
            let state = *controller.state();
            ctx.shared.flight.lock(|flight| *flight = state);

            next += CONTROL_TICK;
            Mono::delay_until(next).await;
        }
    }

    /// US-100 超声波测距
    #[task(priority = 1, local = [us100], shared = [ultrasonic, validity])]
    async fn sample_ultrasonic(mut ctx: sample_ultrasonic::Context) {
        let us100 = ctx.local.us100;
        let mut filter = UltrasonicFilter::new();
        let mut validity = ValidityEstimator::new();

        loop {
            us100.trigger();
            let started = Mono::now();
            let reading = loop {
                match us100.poll() {
                    Ok(distance) => break distance,
                    Err(nb::Error::WouldBlock)
                        if elapsed(Mono::now(), started) < ULTRASONIC_TIMEOUT =>
                    {
                        Mono::delay(ULTRASONIC_POLL).await;
                    }
                    Err(nb::Error::WouldBlock) => {
                        defmt::debug!("us-100 timeout");
                        break None;
                    }
                    Err(nb::Error::Other(err)) => {
                        defmt::warn!("us-100 serial: {}", Debug2Format(&err));
                        break None;
                    }
                }
            };

            let distance = filter.update(reading);
            let rate = validity.record(distance.is_some());
            ctx.shared.ultrasonic.lock(|ultrasonic| *ultrasonic = distance);
            ctx.shared.validity.lock(|validity| *validity = rate);

            Mono::delay(ULTRASONIC_POLL).await;
        }
    }

    /// MPL3115A2 气压计
    #[task(priority = 1, local = [mpl3115a2], shared = [barometer])]
    async fn sample_barometer(mut ctx: sample_barometer::Context) {
        let Some(sensor) = ctx.local.mpl3115a2.as_mut() else {
            return;
        };
        let mut filter = BarometerFilter::new();
        let mut next = Mono::now();

        loop {
            match sensor.read() {
                Ok(Some((pressure, temperature))) => {
                    if let Some(sample) = filter.update(pressure, temperature) {
                        ctx.shared.barometer.lock(|barometer| *barometer = Some(sample));
                    }
                }
                Ok(None) => {}
                Err(err) => defmt::warn!("mpl3115a2 read: {}", Debug2Format(&err)),
            }

            next += BAROMETER_POLL;
            Mono::delay_until(next).await;
        }
    }

    /// PID 升力控制与执行机构输出
    #[task(priority = 1, local = [esc], shared = [flight, power])]
    async fn lift(mut ctx: lift::Context) {
        let mut lift = LiftController::new();
        let mut next = Mono::now();

        loop {
            let state = ctx.shared.flight.lock(|flight| *flight);
            let force = lift.compute(&state);
            ctx.local.esc.apply(Pulses::new(&state, force));
            ctx.shared.power.lock(|power| *power = force.unwrap_or(0.0));

            next += Duration::millis(PID_SAMPLE_TIME_MS);
            Mono::delay_until(next).await;
        }
    }

    /// 信号灯
    #[task(priority = 1, local = [signal])]
    async fn blink(ctx: blink::Context) {
        loop {
            ctx.local.signal.on();
            Mono::delay(SIGNAL_LED_ON).await;
            ctx.local.signal.off();
            Mono::delay(SIGNAL_LED_PERIOD - SIGNAL_LED_ON).await;
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

/// 发送一个数据包
fn transmit(
    radio: &mut impl rtic::Mutex<T = Nrf24L01>,
    packet: Result<Packet, protocol::Error>,
) {
    match packet {
        Ok(packet) => {
            if let Err(err) = radio.lock(|radio| radio.send(&packet)) {
                defmt::error!("nrf24l01 send: {}", Debug2Format(&err));
            }
        }
        Err(err) => defmt::error!("encode failed: {}", err),
    }
}
