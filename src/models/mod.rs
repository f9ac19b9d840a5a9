//! # 数据模型模块
//!
//! 定义项目模型、气候数据集、运行状态与汇总结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `engine/`, `batch/`, `report/` 和 `commands/` 使用
//! - 子模块: project, run, summary

pub mod project;
pub mod run;
pub mod summary;

pub use project::{ClimateDataset, ClimateHandle, ProjectModel};
pub use run::{FailureKind, RawRunOutput, RunFailure, RunState, RunStatus, StepRecord, ZoneMetadata};
pub use summary::{BatchResult, BatchTally, SummaryRow};
