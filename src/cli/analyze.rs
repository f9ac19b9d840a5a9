//! # analyze 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/analyze.rs`

use clap::Args;
use std::path::PathBuf;

/// analyze 子命令参数
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// NDJSON file written by a streaming batch
    pub ndjson_file: PathBuf,

    /// Save the table to CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Indoor air temperature threshold for overheating hours (°C)
    #[arg(long, default_value_t = 26.0)]
    pub threshold: f64,
}
