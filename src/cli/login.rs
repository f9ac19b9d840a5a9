//! # login 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/login.rs`

use super::engine::EngineArgs;

use clap::Args;

/// login 子命令参数
#[derive(Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}
