//! 传感器
//!
//! 寄存器数据的换算与硬件无关；I2C/串口驱动只在 `firmware` 特性下编译。
pub mod mpl3115a2;
pub mod us100;
