//! # 无线模块的模式记录
//!
//! 无线模块的模式切换会消耗设备对象，切换失败时设备随错误一起返回。
//! 这里把设备保存下来，下一次收发前重新进入接收模式，而不是让链路永久中断。

/// 设备当前的模式
///
/// `R`: 接收模式下的设备；`D`: 切换失败后返回的设备。
pub enum RadioMode<R, D> {
    Rx(R),
    /// 切换失败，等待重新进入接收模式
    Parked(D),
    /// 设备已丢失，只能复位
    Offline,
}

impl<R, D> RadioMode<R, D> {
    /// 接收模式下的设备
    ///
    /// 设备处于 `Parked` 时先用 `restore` 重新进入接收模式，失败时设备继续保留。
    /// 设备已丢失时返回 `Ok(None)`。
    pub fn rx<E>(
        &mut self,
        restore: impl FnOnce(D) -> Result<R, (D, E)>,
    ) -> Result<Option<&mut R>, E> {
        if let RadioMode::Parked(_) = self {
            if let RadioMode::Parked(device) = core::mem::replace(self, RadioMode::Offline) {
                match restore(device) {
                    Ok(rx) => {
                        info!("无线模块恢复接收模式");
                        *self = RadioMode::Rx(rx);
                    }
                    Err((device, err)) => {
                        *self = RadioMode::Parked(device);
                        return Err(err);
                    }
                }
            }
        }
        match self {
            RadioMode::Rx(rx) => Ok(Some(rx)),
            _ => Ok(None),
        }
    }

    /// 取出接收模式下的设备用于发送，之后必须用 `resume` 或 `park` 放回
    pub fn take_rx(&mut self) -> Option<R> {
        match core::mem::replace(self, RadioMode::Offline) {
            RadioMode::Rx(rx) => Some(rx),
            other => {
                *self = other;
                None
            }
        }
    }

    /// 回到接收模式
    pub fn resume(&mut self, rx: R) {
        *self = RadioMode::Rx(rx);
    }

    /// 保存切换失败后返回的设备
    pub fn park(&mut self, device: D) {
        warn!("无线模块模式切换失败");
        *self = RadioMode::Parked(device);
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, RadioMode::Offline)
    }
}
