//! # 高度估计
//!
//! 超声波测距在近地面时准确但量程有限，气压高度始终可用但会漂移。
//! 每次有效的超声波读数都会重新标定气压高度的偏移量。

pub mod filter;
pub mod height;
pub mod validity;

pub use height::{HeightEstimate, HeightEstimator};
pub use validity::ValidityEstimator;
