//! # stream 子命令 CLI 定义
//!
//! 流式模式下引擎会弹出保存位置对话框，因此必须使用 `--headed`。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/stream.rs`

use super::engine::EngineArgs;
use super::MAX_TIMEOUT_SECS;

use clap::Args;
use std::path::PathBuf;

/// stream 子命令参数
#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Project definition file (.sxi)
    pub project: PathBuf,

    /// Directory containing climate files
    pub climate_dir: PathBuf,

    /// Climate file pattern
    #[arg(long, default_value = "*.epw")]
    pub pattern: String,

    /// Timeout per simulation in seconds (the whole batch gets one per climate plus a minute)
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: u64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 300)]
    pub poll_ms: u64,

    #[command(flatten)]
    pub engine: EngineArgs,
}
