//! 超声波与气压计融合的当前高度

use crate::config::ULTRASONIC_MAX_MM;

/// 高度估计结果
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeightEstimate {
    /// 当前高度 (m)
    pub height: f32,
    /// 本次超声波读数是否有效
    pub ultrasonic_valid: bool,
}

/// 高度估计器
#[derive(Debug, Default)]
pub struct HeightEstimator {
    /// 气压高度与离地高度之差，第一次更新前未标定
    offset: Option<f32>,
}

impl HeightEstimator {
    pub const fn new() -> Self {
        HeightEstimator { offset: None }
    }

    /// 当前的气压高度偏移量
    pub fn offset(&self) -> Option<f32> {
        self.offset
    }

    /// 融合一次采样
    ///
    /// `ultrasonic`: 超声波距离 (m)；`altitude`: 气压高度 (m)。
    /// 超声波读数有效时直接采用，并重新标定偏移量；
    /// 否则使用气压高度减去最近一次的偏移量。
    pub fn update(&mut self, ultrasonic: Option<f32>, altitude: f32) -> HeightEstimate {
        let offset = *self.offset.get_or_insert(altitude);

        match ultrasonic.filter(|d| in_range(*d)) {
            Some(distance) => {
                self.offset = Some(altitude - distance);
                HeightEstimate {
                    height: distance,
                    ultrasonic_valid: true,
                }
            }
            None => HeightEstimate {
                height: altitude - offset,
                ultrasonic_valid: false,
            },
        }
    }
}

fn in_range(distance: f32) -> bool {
    distance > 0.0 && distance < ULTRASONIC_MAX_MM as f32 / 1000.0
}
