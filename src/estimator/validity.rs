//! 超声波有效率

use heapless::HistoryBuffer;

use crate::config::{VALIDITY_INITIAL_INVALID, VALIDITY_WINDOW};

/// 最近 40 次超声波采样的有效率
///
/// 上电时窗口为 10 个无效样本加 30 个有效样本。
pub struct ValidityEstimator {
    window: HistoryBuffer<bool, VALIDITY_WINDOW>,
}

impl ValidityEstimator {
    pub fn new() -> Self {
        let mut window = HistoryBuffer::new();
        for index in 0..VALIDITY_WINDOW {
            window.write(index >= VALIDITY_INITIAL_INVALID);
        }
        ValidityEstimator { window }
    }

    /// 记录一次采样，丢弃最旧的样本，返回新的有效率
    pub fn record(&mut self, valid: bool) -> f32 {
        self.window.write(valid);
        self.rate()
    }

    /// 当前有效率 [0, 1]
    pub fn rate(&self) -> f32 {
        let valid = self.window.as_slice().iter().filter(|v| **v).count();
        valid as f32 / VALIDITY_WINDOW as f32
    }
}

impl Default for ValidityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_biased_towards_valid() {
        assert_eq!(ValidityEstimator::new().rate(), 0.75);
    }

    #[test]
    fn oldest_sample_is_dropped_first() {
        let mut estimator = ValidityEstimator::new();
        // 最旧的 10 个无效样本先被挤出
        for _ in 0..10 {
            estimator.record(true);
        }
        assert_eq!(estimator.rate(), 1.0);
        assert_eq!(estimator.record(false), 39.0 / 40.0);
    }

    #[test]
    fn collapses_to_zero() {
        let mut estimator = ValidityEstimator::new();
        let mut rate = 1.0;
        for _ in 0..VALIDITY_WINDOW {
            rate = estimator.record(false);
        }
        assert_eq!(rate, 0.0);
    }
}
