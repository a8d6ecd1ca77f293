//! 飞艇端链路会话

use crate::{
    config::{AIRSHIP_ADDRESS, EMERGENCY_PERIOD},
    protocol::{
        packet::{decode_value_field, encode_confirmation, CommandFrame},
        CommandId, Counter, Error, Packet, ValidCommand,
    },
    time::{elapsed, Instant},
};

/// 一条需要控制循环处理并确认的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inbound {
    /// 校验通过的序号
    pub counter: Option<Counter>,
    /// 校验通过的命令，或者失败原因
    pub outcome: Result<ValidCommand, Error>,
}

/// 收到数据包的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reception {
    /// 不是发给本机的数据包
    Ignored,
    /// 心跳，不需要回复
    Heartbeat,
    /// 已经处理过的重发，回复上一次的确认
    Duplicate,
    /// 新消息，交给控制循环处理后回复确认
    Command(Inbound),
}

/// 飞艇端链路会话
///
/// 命令在确认时才记为已接受：没有进入控制循环的命令，重发时仍按新命令处理。
pub struct AirshipSession {
    last_accepted: Counter,
    last_received: Option<Instant>,
    /// 最近一次 VALID 确认
    last_confirmation: Option<(Counter, Packet)>,
}

impl AirshipSession {
    pub fn new() -> Self {
        AirshipSession {
            last_accepted: Counter::new(Counter::MAX),
            last_received: None,
            last_confirmation: None,
        }
    }

    /// 最近一次接受的序号
    pub fn last_accepted(&self) -> Counter {
        self.last_accepted
    }

    /// 最近一次收到发给本机的数据包的时刻
    pub fn last_received(&self) -> Option<Instant> {
        self.last_received
    }

    /// 分类一个收到的数据包
    ///
    /// 只做校验与去重，不修改飞行状态。
    pub fn receive(&mut self, bytes: &[u8], now: Instant) -> Reception {
        match bytes.first() {
            Some(&AIRSHIP_ADDRESS) => {}
            Some(&other) => {
                debug!("{}", Error::AddressMismatch(other));
                return Reception::Ignored;
            }
            None => return Reception::Ignored,
        }
        self.last_received = Some(now);

        let frame = match CommandFrame::split(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("{}", err);
                return Reception::Command(Inbound {
                    counter: None,
                    outcome: Err(err),
                });
            }
        };

        let counter = frame.counter();
        let id = CommandId::try_from(frame.id_byte);

        if frame.id_byte == CommandId::SayHi as u8 {
            if let Ok(counter) = counter {
                self.last_accepted = counter;
            }
            trace!("SAY_HI");
            return Reception::Heartbeat;
        }

        if let (Ok(counter), Ok(_)) = (counter, id) {
            if counter == self.last_accepted {
                info!("重复的序号 {}", counter.get());
                return Reception::Duplicate;
            }
        }

        let outcome = counter.and(id).and_then(|id| {
            let value = if id.carries_value() {
                decode_value_field(frame.value)?
            } else {
                0
            };
            Ok(ValidCommand { id, value })
        });

        match (&outcome, counter) {
            (Ok(cmd), Ok(counter)) => debug!("收到 {:?}, 序号 {}", cmd.id, counter.get()),
            (Err(err), _) => warn!("无效消息: {}", err),
            _ => {}
        }

        Reception::Command(Inbound {
            counter: counter.ok(),
            outcome,
        })
    }

    /// 处理完成后的确认报告
    ///
    /// 序号校验通过时回复该消息的序号，否则回复最近接受的序号。
    /// 校验通过的命令从这里开始算作已接受，之后的重发按重复消息回复。
    pub fn confirm(&mut self, inbound: &Inbound, flags: u8) -> Result<Packet, Error> {
        let counter = inbound.counter.unwrap_or(self.last_accepted);
        let valid = inbound.outcome.is_ok();
        let packet = encode_confirmation(flags, counter, valid)?;
        if valid {
            self.last_accepted = counter;
            self.last_confirmation = Some((counter, packet.clone()));
        }
        Ok(packet)
    }

    /// 重复消息的回复：上一次的确认原样重发
    pub fn duplicate_reply(&self, flags: u8) -> Result<Packet, Error> {
        match &self.last_confirmation {
            Some((counter, packet)) if *counter == self.last_accepted => Ok(packet.clone()),
            _ => encode_confirmation(flags, self.last_accepted, true),
        }
    }

    /// 是否失联
    ///
    /// 从未收到过数据包，或者距上一次收到超过 50 s。
    pub fn link_lost(&self, now: Instant) -> bool {
        match self.last_received {
            Some(since) => elapsed(now, since) > EMERGENCY_PERIOD,
            None => true,
        }
    }
}

impl Default for AirshipSession {
    fn default() -> Self {
        Self::new()
    }
}
