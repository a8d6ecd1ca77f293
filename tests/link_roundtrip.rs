//! 遥控器会话 ⇄ 飞艇会话 ⇄ 飞行状态机 的完整交互

use blimp_link::{
    estimator::HeightEstimate,
    flight::{FlightController, FlightState},
    link::{AirshipSession, ControllerSession, Event, Reception},
    protocol::{
        packet::{ReportBody, ReportFrame},
        parity::encode_counter,
        CommandId, Counter, Packet, MAX_PACKET_LEN,
    },
    time::Instant,
};

fn at(ms: u32) -> Instant {
    Instant::from_ticks(ms)
}

/// 无线模块按固定 32 字节收发，不足部分为 0
fn over_the_air(packet: &[u8]) -> Packet {
    let mut padded = Packet::from_slice(packet).unwrap();
    padded.resize(MAX_PACKET_LEN, 0).unwrap();
    padded
}

struct Airship {
    session: AirshipSession,
    flight: FlightController,
}

impl Airship {
    fn new(state: FlightState) -> Self {
        Airship {
            session: AirshipSession::new(),
            flight: FlightController::from_state(state),
        }
    }

    /// 收到一个数据包并处理，返回要发回的报告
    fn handle(&mut self, packet: &[u8], now: Instant) -> Option<Packet> {
        match self.session.receive(&over_the_air(packet), now) {
            Reception::Ignored | Reception::Heartbeat => None,
            Reception::Duplicate => {
                let flags = self.flight.state().flags();
                Some(self.session.duplicate_reply(flags).unwrap())
            }
            Reception::Command(inbound) => {
                if let Ok(cmd) = inbound.outcome {
                    self.flight.process(cmd);
                }
                let flags = self.flight.state().flags();
                Some(self.session.confirm(&inbound, flags).unwrap())
            }
        }
    }
}

fn hovering(height: f32) -> FlightState {
    FlightState {
        required_height: height,
        current_height: height,
        ultrasonic_valid: true,
        do_not_move: false,
        ..FlightState::new()
    }
}

/// 发送一条命令并把确认交回遥控器
fn exchange(
    controller: &mut ControllerSession,
    airship: &mut Airship,
    id: CommandId,
    value: Option<f32>,
    now: Instant,
) -> Counter {
    let cmd = controller.next_command(id, value);
    let packet = controller.submit(cmd, now).unwrap();
    let reply = airship.handle(&packet, now).unwrap();
    let reply = over_the_air(&reply);
    assert_eq!(controller.on_packet(&reply, now), Event::Confirmed(cmd.counter));
    assert!(!controller.awaiting_confirmation());
    cmd.counter
}

#[test]
fn up_twice_from_two_metres() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(2.0));

    exchange(&mut controller, &mut airship, CommandId::Up, None, at(1_000));
    assert_eq!(airship.flight.state().required_height, 3.0);

    exchange(&mut controller, &mut airship, CommandId::Up, None, at(2_000));
    assert_eq!(airship.flight.state().required_height, 4.0);
}

#[test]
fn set_exact_height() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(1.0));

    exchange(
        &mut controller,
        &mut airship,
        CommandId::SetExactHeight,
        Some(6.2),
        at(1_000),
    );
    assert!((airship.flight.state().required_height - 6.2).abs() < 1e-4);
}

#[test]
fn unknown_command_gets_error_and_changes_nothing() {
    let before = hovering(2.0);
    let mut airship = Airship::new(before);

    let packet = [0x11, 0xBB, encode_counter(Counter::new(5)), 0x01];
    let reply = airship.handle(&packet, at(100)).unwrap();

    let frame = ReportFrame::split(&reply).unwrap();
    assert_eq!(
        frame.body,
        Ok(ReportBody::Confirmation {
            counter: Counter::new(5),
            payload: "ERROR"
        })
    );
    assert_eq!(*airship.flight.state(), before);

    // 同一序号的合法命令不会被当作重复
    let packet = [0x11, 0xBB, encode_counter(Counter::new(5)), CommandId::Up as u8];
    let reply = airship.handle(&packet, at(200)).unwrap();
    assert!(reply.ends_with(b"VALID"));
    assert_eq!(airship.flight.state().required_height, 3.0);
}

#[test]
fn resent_command_gets_identical_reply_and_is_applied_once() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(2.0));

    let cmd = controller.next_command(CommandId::Up, None);
    let packet = controller.submit(cmd, at(1_000)).unwrap();
    // 第一次的确认丢失
    let first = airship.handle(&packet, at(1_000)).unwrap();

    assert_eq!(controller.poll(at(1_500)), None);
    let resent = controller.poll(at(1_501)).unwrap();
    assert_eq!(resent, packet);
    assert_eq!(controller.attempts(), 2);

    let second = airship.handle(&resent, at(1_501)).unwrap();
    assert_eq!(second, first);
    assert_eq!(airship.flight.state().required_height, 3.0);

    assert_eq!(
        controller.on_packet(&over_the_air(&second), at(1_510)),
        Event::Confirmed(cmd.counter)
    );
}

#[test]
fn error_reply_triggers_immediate_resend() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(2.0));

    let cmd = controller.next_command(CommandId::SetExactHeight, Some(4.0));
    let packet = controller.submit(cmd, at(1_000)).unwrap();

    // 数值在传输中损坏，校验位不再匹配
    let mut corrupted = packet.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    let reply = airship.handle(&corrupted, at(1_000)).unwrap();
    assert_eq!(
        controller.on_packet(&over_the_air(&reply), at(1_010)),
        Event::Rejected(cmd.counter)
    );
    assert_eq!(airship.flight.state().required_height, 2.0);

    // 不等重发间隔
    let resent = controller.poll(at(1_020)).unwrap();
    assert_eq!(resent, packet);
    let reply = airship.handle(&resent, at(1_020)).unwrap();
    assert_eq!(
        controller.on_packet(&over_the_air(&reply), at(1_030)),
        Event::Confirmed(cmd.counter)
    );
    assert_eq!(airship.flight.state().required_height, 4.0);
}

#[test]
fn heartbeat_needs_no_confirmation() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(2.0));

    assert!(!controller.heartbeat_due(at(5_400)));
    assert!(controller.heartbeat_due(at(5_401)));

    let hi = controller.next_command(CommandId::SayHi, None);
    let packet = controller.submit(hi, at(5_401)).unwrap();
    assert!(!controller.awaiting_confirmation());
    assert_eq!(airship.handle(&packet, at(5_401)), None);
    assert_eq!(airship.session.last_received(), Some(at(5_401)));
}

#[test]
fn land_from_five_metres() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(5.0));

    exchange(&mut controller, &mut airship, CommandId::Land, None, at(1_000));
    assert!(controller.status().land);
    assert!(airship.flight.state().land);

    // 简单的高度响应：每个周期向目标高度靠近 30%
    let mut height = 5.0_f32;
    let mut landed = false;
    for _ in 0..200 {
        let ultrasonic_valid = height < 3.5;
        let estimate = HeightEstimate {
            height,
            ultrasonic_valid,
        };
        let rate = if ultrasonic_valid { 1.0 } else { 0.5 };
        airship.flight.tick(estimate, rate, false);

        let state = airship.flight.state();
        if state.do_not_move {
            landed = true;
            break;
        }
        height += (state.required_height - height) * 0.3;
    }

    assert!(landed, "still flying at {height} m");
    assert!(height < 0.1);
    assert_eq!(airship.flight.state().required_height, 0.05);
}

#[test]
fn link_loss_starts_landing() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(3.0));

    exchange(&mut controller, &mut airship, CommandId::Up, None, at(1_000));
    let estimate = HeightEstimate {
        height: 3.0,
        ultrasonic_valid: true,
    };

    assert!(!airship.session.link_lost(at(51_000)));
    assert!(airship.session.link_lost(at(51_001)));
    airship.flight.tick(estimate, 1.0, airship.session.link_lost(at(51_001)));
    assert!(airship.flight.state().land);
    assert_eq!(airship.flight.state().required_height, 0.5);
}

#[test]
fn silent_airship_lands_and_land_resumes_control() {
    let mut controller = ControllerSession::new(at(0));
    let mut airship = Airship::new(hovering(2.0));
    let estimate = HeightEstimate {
        height: 2.0,
        ultrasonic_valid: true,
    };

    // 还没有收到任何数据包
    airship.flight.tick(estimate, 1.0, airship.session.link_lost(at(100)));
    assert!(airship.flight.state().land);
    assert_eq!(airship.flight.state().required_height, 0.5);

    exchange(&mut controller, &mut airship, CommandId::Land, None, at(1_000));
    assert!(!airship.session.link_lost(at(1_100)));
    assert!(!airship.flight.state().land);
    assert_eq!(airship.flight.state().required_height, 2.0);
}

#[test]
fn telemetry_reaches_controller_with_status() {
    use blimp_link::protocol::{packet::encode_measured_data, telemetry::Telemetry};

    let mut controller = ControllerSession::new(at(0));
    let mut state = hovering(2.0);
    state.fly_forward = true;

    let telemetry = Telemetry {
        current_height: 2.0,
        required_height: 2.0,
        ..Telemetry::default()
    };
    let (frame, _) = telemetry.frame(0);
    let packet = encode_measured_data(state.flags(), &frame).unwrap();

    assert_eq!(
        controller.on_packet(&over_the_air(&packet), at(100)),
        Event::Telemetry("CurrentHeight : 2.00\n")
    );
    assert!(controller.status().fly_forward);
    assert!(!controller.status().land);
}

#[test]
fn packets_for_someone_else_are_ignored() {
    let mut airship = Airship::new(hovering(2.0));
    let packet = [0x22, 0xBB, encode_counter(Counter::new(1)), CommandId::Up as u8];
    assert_eq!(airship.handle(&packet, at(10)), None);
    assert_eq!(airship.session.last_received(), None);

    let mut controller = ControllerSession::new(at(0));
    assert_eq!(controller.on_packet(&[0x11, 0xBB, 0x00], at(10)), Event::Ignored);
}
