//! # 报告输出模块
//!
//! 终端表格、CSV 与 JSON 三种结果出口。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: table, export

pub mod export;
pub mod table;
