//! # 工具函数模块
//!
//! 提供美化输出、进度条、会话存储与中断监听。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: output, progress, session, signal

pub mod output;
pub mod progress;
pub mod session;
pub mod signal;
