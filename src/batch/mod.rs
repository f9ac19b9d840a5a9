//! # 批量运行模块
//!
//! 把一个项目在多份气候数据上批量运行。
//!
//! ## 功能
//! - 收集并装载气候文件（`loader`）
//! - 按顺序调度运行，流式或逐个（`scheduler`）
//! - 轮询进度、超时与中断（`tracker`）
//! - 归约逐步输出并汇编批次结果（`reducer`, `assembler`）
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `engine::RemoteEngine`
//! - 使用 `walkdir` 收集文件，`chrono` 生成时间戳

pub mod assembler;
pub mod collector;
pub mod loader;
pub mod reducer;
pub mod scheduler;
pub mod tracker;

pub use loader::{collect_climate_files, read_climate_inputs, stage, ClimateInput};
pub use reducer::ReductionProfile;
pub use scheduler::{RunScheduler, SchedulerConfig, SchedulerEvent};
pub use tracker::{CancelToken, ProgressEvent};
