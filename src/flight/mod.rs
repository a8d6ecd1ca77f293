//! # 飞行控制状态机
//!
//! 两种状态：飞行与降落。
//! - 飞行：由遥控命令调整目标高度
//! - 降落：目标高度由降落过程自主控制，遥控命令只影响转向与前进
//!
//! 状态机只接收链路会话校验通过的命令。

pub mod machine;
pub mod state;

pub use machine::FlightController;
pub use state::FlightState;
