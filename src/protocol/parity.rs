//! # 奇偶校验编解码
//!
//! 无线链路只用单比特偶校验检测数据损坏，不使用 CRC。
//! 三种字段：
//! - 状态字节: `0x0y 0z0w`，land 与其校验位、flyForward 与其校验位分别位于 bit 6、4、2、0
//! - 计数字节: bit 0~6 为 7 位序号，bit 7 为序号的偶校验位
//! - 带校验的数值: 原值左移一位，bit 0 为原值（移位前）的偶校验位
//!
//! 所有函数都是纯函数，没有失败情况；输入由调用方截断到相应位宽。

/// 计算偶校验位：所有置位比特的异或
pub const fn even_parity(number: u32) -> bool {
    number.count_ones() % 2 == 1
}

/// 7 位消息序号 (0~127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counter(u8);

impl Counter {
    /// 最大序号
    pub const MAX: u8 = 0x7F;

    /// 创建序号，超出 7 位的部分被截断
    pub const fn new(value: u8) -> Self {
        Counter(value & Self::MAX)
    }

    /// 序号值
    pub const fn get(self) -> u8 {
        self.0
    }

    /// 下一个序号，127 之后回到 0
    pub const fn next(self) -> Self {
        if self.0 >= Self::MAX {
            Counter(0)
        } else {
            Counter(self.0 + 1)
        }
    }
}

/// 状态字节中解出的四个比特
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlagBits {
    pub land: bool,
    pub land_parity: bool,
    pub fly_forward: bool,
    pub fly_forward_parity: bool,
}

impl FlagBits {
    /// 校验通过时返回降落标志
    pub fn land(&self) -> Option<bool> {
        check_parity(self.land as u32, self.land_parity).then_some(self.land)
    }

    /// 校验通过时返回前进标志
    pub fn fly_forward(&self) -> Option<bool> {
        check_parity(self.fly_forward as u32, self.fly_forward_parity).then_some(self.fly_forward)
    }
}

/// 比较数值的偶校验与收到的校验位
pub const fn check_parity(number: u32, expected: bool) -> bool {
    even_parity(number) == expected
}

/// 编码状态字节
pub const fn encode_flags(land: bool, fly_forward: bool) -> u8 {
    ((land as u8) << 6)
        | ((even_parity(land as u32) as u8) << 4)
        | ((fly_forward as u8) << 2)
        | (even_parity(fly_forward as u32) as u8)
}

/// 解码状态字节
pub const fn decode_flags(byte: u8) -> FlagBits {
    FlagBits {
        land: (byte >> 6) & 1 == 1,
        land_parity: (byte >> 4) & 1 == 1,
        fly_forward: (byte >> 2) & 1 == 1,
        fly_forward_parity: byte & 1 == 1,
    }
}

/// 编码计数字节
pub const fn encode_counter(counter: Counter) -> u8 {
    let mut byte = counter.get();
    if even_parity(byte as u32) {
        byte |= 0x80;
    }
    byte
}

/// 解码计数字节，返回序号与收到的校验位
pub const fn decode_counter(byte: u8) -> (Counter, bool) {
    (Counter::new(byte), (byte >> 7) & 1 == 1)
}

/// 数值编码：左移一位，最低位放原值的偶校验位
pub const fn encode_value(value: i32) -> i32 {
    (value << 1) | even_parity(value as u32) as i32
}

/// 数值解码：算术右移恢复原值，返回原值与收到的校验位
pub const fn decode_value(encoded: i32) -> (i32, bool) {
    (encoded >> 1, encoded & 1 == 1)
}
