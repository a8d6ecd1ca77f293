//! 遥控器端链路会话
//!
//! 状态：`Idle → Sent → (确认 | Retrying) → Idle`。
//! 需要确认的命令在收到对应序号的 VALID 之前按 500 ms 间隔无限重发，
//! 期间不接受新的命令；心跳只发送一次，不等待确认。

use thiserror::Error;

use crate::{
    config::{CONTROLLER_ADDRESS, HEARTBEAT_INTERVAL, RETRY_INTERVAL},
    protocol::{
        packet::{encode_command, ReportBody, ReportFrame},
        Command, CommandId, Counter, Error, Packet, CONFIRMATION_VALID,
    },
    time::{elapsed, Instant},
};

/// 发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// 没有等待确认的命令
    Idle,
    /// 已发送，等待确认
    Sent,
    /// 已重发，等待确认
    Retrying,
}

/// 提交命令失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    #[error("上一条命令还在等待确认")]
    Busy,
    #[error(transparent)]
    Encode(#[from] Error),
}

/// 收到报告后的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<'a> {
    /// 正在等待的命令被确认
    Confirmed(Counter),
    /// 飞艇对正在等待的命令回复了 ERROR
    Rejected(Counter),
    /// 测量数据
    Telemetry(&'a str),
    /// 与当前命令无关或无法解析的报告
    Ignored,
}

/// 飞艇报告中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AirshipStatus {
    pub land: bool,
    pub fly_forward: bool,
}

/// 遥控器端链路会话
pub struct ControllerSession {
    /// 最近一次分配的序号
    counter: Counter,
    phase: Phase,
    in_flight: Option<(Command, Packet)>,
    last_send: Instant,
    last_received: Option<Instant>,
    resend_requested: bool,
    attempts: u32,
    status: AirshipStatus,
}

impl ControllerSession {
    pub fn new(boot: Instant) -> Self {
        ControllerSession {
            counter: Counter::new(0),
            phase: Phase::Idle,
            in_flight: None,
            last_send: boot,
            last_received: None,
            resend_requested: false,
            attempts: 0,
            status: AirshipStatus::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 是否在等待确认，等待期间不接受新的用户命令
    pub fn awaiting_confirmation(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// 正在等待确认的命令
    pub fn in_flight(&self) -> Option<&Command> {
        self.in_flight.as_ref().map(|(cmd, _)| cmd)
    }

    /// 当前命令的发送次数
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn status(&self) -> AirshipStatus {
        self.status
    }

    pub fn last_received(&self) -> Option<Instant> {
        self.last_received
    }

    /// 分配下一个序号并创建命令
    ///
    /// 序号 1, 2, ..., 127, 0, 1, ... 与确认结果无关。
    pub fn next_command(&mut self, id: CommandId, value: Option<f32>) -> Command {
        self.counter = self.counter.next();
        Command::new(id, self.counter, value)
    }

    /// 发送一条新命令
    pub fn submit(&mut self, cmd: Command, now: Instant) -> Result<Packet, SubmitError> {
        if self.awaiting_confirmation() {
            return Err(SubmitError::Busy);
        }

        let packet = encode_command(&cmd)?;
        self.last_send = now;

        if cmd.id.needs_confirmation() {
            self.phase = Phase::Sent;
            self.in_flight = Some((cmd, packet.clone()));
            self.resend_requested = false;
            self.attempts = 1;
            info!("首次发送 {:?}, 序号 {}", cmd.id, cmd.counter.get());
        } else {
            info!("发送心跳 SAY_HI");
        }
        Ok(packet)
    }

    /// 检查是否需要重发
    ///
    /// 超过重发间隔或飞艇回复 ERROR 时返回相同的数据包。
    pub fn poll(&mut self, now: Instant) -> Option<Packet> {
        if !self.awaiting_confirmation() {
            return None;
        }
        if !self.resend_requested && elapsed(now, self.last_send) <= RETRY_INTERVAL {
            return None;
        }

        let (cmd, packet) = self.in_flight.as_ref()?;
        self.phase = Phase::Retrying;
        self.resend_requested = false;
        self.last_send = now;
        self.attempts += 1;
        info!(
            "重发 {:?}, 序号 {}, 第 {} 次",
            cmd.id,
            cmd.counter.get(),
            self.attempts
        );
        Some(packet.clone())
    }

    /// 是否需要发送心跳
    pub fn heartbeat_due(&self, now: Instant) -> bool {
        !self.awaiting_confirmation() && elapsed(now, self.last_send) > HEARTBEAT_INTERVAL
    }

    /// 处理飞艇的报告
    pub fn on_packet<'a>(&mut self, bytes: &'a [u8], now: Instant) -> Event<'a> {
        match bytes.first() {
            Some(&CONTROLLER_ADDRESS) => {}
            Some(&other) => {
                debug!("{}", Error::AddressMismatch(other));
                return Event::Ignored;
            }
            None => return Event::Ignored,
        }
        self.last_received = Some(now);

        let frame = match ReportFrame::split(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("{}", err);
                return Event::Ignored;
            }
        };

        if let Some(land) = frame.flags.land() {
            self.status.land = land;
        }
        if let Some(fly_forward) = frame.flags.fly_forward() {
            self.status.fly_forward = fly_forward;
        }

        match frame.body {
            Ok(ReportBody::Confirmation { counter, payload }) => self.on_confirmation(counter, payload),
            Ok(ReportBody::MeasuredData(text)) => Event::Telemetry(text),
            Err(err) => {
                warn!("损坏或未知的报告: {}", err);
                Event::Ignored
            }
        }
    }

    fn on_confirmation<'a>(&mut self, counter: Counter, payload: &str) -> Event<'a> {
        let pending = self.in_flight().map(|cmd| cmd.counter);
        if pending != Some(counter) {
            debug!("序号 {} 的确认与当前命令无关", counter.get());
            return Event::Ignored;
        }

        if payload == CONFIRMATION_VALID {
            info!("已确认, 序号 {}", counter.get());
            self.phase = Phase::Idle;
            self.in_flight = None;
            Event::Confirmed(counter)
        } else {
            error!("--- ERROR --- 序号 {}, 回复 {}", counter.get(), payload);
            self.resend_requested = true;
            Event::Rejected(counter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        packet::{encode_confirmation, encode_measured_data},
        parity::encode_flags,
    };

    fn at(ms: u32) -> Instant {
        Instant::from_ticks(ms)
    }

    #[test]
    fn counters_start_at_one_and_wrap() {
        let mut session = ControllerSession::new(at(0));
        assert_eq!(session.next_command(CommandId::Up, None).counter, Counter::new(1));
        for _ in 2..=127 {
            session.next_command(CommandId::Up, None);
        }
        assert_eq!(session.next_command(CommandId::Up, None).counter, Counter::new(0));
        assert_eq!(session.next_command(CommandId::Up, None).counter, Counter::new(1));
    }

    #[test]
    fn retry_after_interval_sends_identical_packet() {
        let mut session = ControllerSession::new(at(0));
        let cmd = Command::new(CommandId::Down, Counter::new(3), None);
        let first = session.submit(cmd, at(1_000)).unwrap();
        assert_eq!(session.phase(), Phase::Sent);

        assert_eq!(session.poll(at(1_500)), None);
        let second = session.poll(at(1_501)).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.phase(), Phase::Retrying);
        assert_eq!(session.attempts(), 2);

        // 重发之后重新计时
        assert_eq!(session.poll(at(1_900)), None);
        assert!(session.poll(at(2_002)).is_some());
    }

    #[test]
    fn busy_until_confirmed() {
        let mut session = ControllerSession::new(at(0));
        let cmd = session.next_command(CommandId::Up, None);
        session.submit(cmd, at(10)).unwrap();

        let next = session.next_command(CommandId::Down, None);
        assert_eq!(session.submit(next, at(20)), Err(SubmitError::Busy));

        let reply = encode_confirmation(encode_flags(false, false), cmd.counter, true).unwrap();
        assert_eq!(session.on_packet(&reply, at(30)), Event::Confirmed(cmd.counter));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.submit(next, at(40)).is_ok());
    }

    #[test]
    fn confirmation_for_other_counter_is_ignored() {
        let mut session = ControllerSession::new(at(0));
        let cmd = Command::new(CommandId::Up, Counter::new(5), None);
        session.submit(cmd, at(0)).unwrap();

        let reply = encode_confirmation(0, Counter::new(4), true).unwrap();
        assert_eq!(session.on_packet(&reply, at(10)), Event::Ignored);
        assert!(session.awaiting_confirmation());
    }

    #[test]
    fn error_reply_triggers_immediate_resend() {
        let mut session = ControllerSession::new(at(0));
        let cmd = Command::new(CommandId::Up, Counter::new(5), None);
        let first = session.submit(cmd, at(0)).unwrap();

        let reply = encode_confirmation(0, Counter::new(5), false).unwrap();
        assert_eq!(session.on_packet(&reply, at(10)), Event::Rejected(Counter::new(5)));
        assert_eq!(session.poll(at(20)), Some(first));
        assert_eq!(session.poll(at(30)), None);
    }

    #[test]
    fn heartbeat_needs_no_confirmation() {
        let mut session = ControllerSession::new(at(0));
        assert!(!session.heartbeat_due(at(5_400)));
        assert!(session.heartbeat_due(at(5_401)));

        let hi = session.next_command(CommandId::SayHi, None);
        session.submit(hi, at(5_401)).unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.poll(at(7_000)), None);
        assert!(!session.heartbeat_due(at(10_000)));
    }

    #[test]
    fn no_heartbeat_while_waiting() {
        let mut session = ControllerSession::new(at(0));
        let cmd = session.next_command(CommandId::Land, None);
        session.submit(cmd, at(0)).unwrap();
        assert!(!session.heartbeat_due(at(20_000)));
    }

    #[test]
    fn status_flags_follow_reports() {
        let mut session = ControllerSession::new(at(0));
        let report = encode_measured_data(encode_flags(true, true), "Power : 1.00\n").unwrap();
        assert_eq!(session.on_packet(&report, at(5)), Event::Telemetry("Power : 1.00\n"));
        assert_eq!(
            session.status(),
            AirshipStatus {
                land: true,
                fly_forward: true
            }
        );

        // land 位校验失败，保持原值
        let report = [0xBB, 0x11, 0b0001_0000, 0xFF];
        session.on_packet(&report, at(6));
        assert!(session.status().land);
        assert!(!session.status().fly_forward);
        assert_eq!(session.last_received(), Some(at(6)));
    }

    #[test]
    fn foreign_reports_are_ignored() {
        let mut session = ControllerSession::new(at(0));
        assert_eq!(session.on_packet(&[0x11, 0xBB, 0x00, 0x00], at(5)), Event::Ignored);
        assert_eq!(session.last_received(), None);
    }
}
