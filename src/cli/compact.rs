//! # compact 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/compact.rs`

use super::engine::EngineArgs;
use super::MAX_TIMEOUT_SECS;

use clap::Args;
use std::path::PathBuf;

/// compact 子命令参数
#[derive(Args, Debug)]
pub struct CompactArgs {
    /// Project definition file (.sxi)
    pub project: PathBuf,

    /// Directory containing climate files
    pub climate_dir: PathBuf,

    /// Climate file pattern
    #[arg(long, default_value = "*.epw")]
    pub pattern: String,

    /// Save summary rows to CSV (a JSON document is written next to it)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Timeout per simulation in seconds
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: u64,

    /// Indoor air temperature threshold for overheating hours (°C)
    #[arg(long, default_value_t = 26.0)]
    pub threshold: f64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 500)]
    pub poll_ms: u64,

    #[command(flatten)]
    pub engine: EngineArgs,
}
