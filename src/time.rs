//! 时间类型
//!
//! 与 RTIC systick 单调时钟（1 kHz）一致的毫秒时刻与时长。

/// 毫秒时刻
pub type Instant = fugit::TimerInstantU32<1000>;
/// 毫秒时长
pub type Duration = fugit::MillisDurationU32;

/// `since` 到 `now` 经过的时间
///
/// 时钟回绕后 `since` 可能"晚于" `now`，此时视为没有经过时间。
pub fn elapsed(now: Instant, since: Instant) -> Duration {
    now.checked_duration_since(since)
        .unwrap_or(Duration::from_ticks(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_across_wrap() {
        let since = Instant::from_ticks(u32::MAX - 99);
        let now = Instant::from_ticks(100);
        assert_eq!(elapsed(now, since), Duration::millis(200));
    }

    #[test]
    fn elapsed_never_negative() {
        let since = Instant::from_ticks(1_000);
        let now = Instant::from_ticks(900);
        assert_eq!(elapsed(now, since), Duration::from_ticks(0));
    }
}
