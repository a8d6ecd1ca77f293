//! # 链路会话
//!
//! 在不可靠的无线数据包之上实现可靠的命令传递：
//! - 遥控器端：分配序号、发送、按 500 ms 重发直到收到确认
//! - 飞艇端：地址过滤、校验、去重，把校验通过的命令交给控制循环
//!
//! 协议层的错误在这里被分类处理，不会传递到飞行状态机。

pub mod airship;
pub mod controller;

pub use airship::{AirshipSession, Inbound, Reception};
pub use controller::{ControllerSession, Event, Phase, SubmitError};
