//! 遥测数据
//!
//! 每行 `Key : value\n`，按整行打包进一个测量数据报告。

use core::fmt::Write;

use heapless::String;

use super::packet::MEASURED_DATA_LEN;

/// 遥测条目数
pub const TELEMETRY_LINES: usize = 7;

/// 飞艇遥测快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub current_height: f32,
    pub required_height: f32,
    /// 温度 (°C)
    pub temperature: f32,
    /// 气压 (Pa)
    pub pressure: f32,
    /// 气压高度 (m)
    pub altitude: f32,
    /// 升力控制输出
    pub power: f32,
    pub validity_rate: f32,
}

/// 一帧遥测载荷
pub type Frame = String<MEASURED_DATA_LEN>;

impl Telemetry {
    fn entry(&self, index: usize) -> (&'static str, f32) {
        match index % TELEMETRY_LINES {
            0 => ("CurrentHeight", self.current_height),
            1 => ("RequiredHeight", self.required_height),
            2 => ("Temperature", self.temperature),
            3 => ("Pressure", self.pressure),
            4 => ("Altitude", self.altitude),
            5 => ("Power", self.power),
            _ => ("ValidityRate", self.validity_rate),
        }
    }

    fn line(&self, index: usize) -> Option<String<32>> {
        let (key, value) = self.entry(index);
        let mut line = String::new();
        writeln!(line, "{} : {:.2}", key, value).ok()?;
        Some(line)
    }

    /// 从第 `start` 行开始打包一帧
    ///
    /// 只放整行；单独一行放不下时跳过该行。返回帧与下一帧的起始行。
    pub fn frame(&self, start: usize) -> (Frame, usize) {
        let mut frame = Frame::new();
        let mut index = start % TELEMETRY_LINES;

        for _ in 0..TELEMETRY_LINES {
            let Some(line) = self.line(index) else {
                index = (index + 1) % TELEMETRY_LINES;
                continue;
            };
            // 帧的容量就是测量数据的最大长度，放不下时不会写入
            if frame.push_str(&line).is_err() && !frame.is_empty() {
                break;
            }
            index = (index + 1) % TELEMETRY_LINES;
        }
        (frame, index)
    }
}
