//! # Acquisition
//!
//! 采集运行器：信号线程按帧推进信号树并触发相机，数据线程轮询相机并推进数据树。
//!
//! - `Acquisition::start` 构建双树、准备显微镜并启动两个线程
//! - `AcquisitionHandle::join` 等待两线程结束，执行清理并汇总 `AcquisitionReport`
//! - 任一侧首个错误会停止另一侧，`join` 返回该错误
//!
//! `SyntheticMicroscope` 提供内存相机，用于演练和测试。

mod error;
mod report;
mod runner;
mod synthetic;

pub use error::AcquisitionError;
pub use report::AcquisitionReport;
pub use runner::{Acquisition, AcquisitionHandle};
pub use synthetic::{SyntheticConfig, SyntheticMicroscope};
