//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `compact`: 逐个运行，本地归约为三项指标，输出表格/CSV/JSON
//! - `stream`: 一次批量调用，结果由引擎直接写出
//! - `analyze`: 分析流式模式写出的 NDJSON 结果
//! - `login`: 登录并保存会话
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: engine, compact, stream, analyze, login

pub mod analyze;
pub mod compact;
pub mod engine;
pub mod login;
pub mod stream;

use clap::{Parser, Subcommand};

/// `--timeout` 上限（一周）
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// bembatch - 建筑能耗模拟批量运行工具
#[derive(Parser)]
#[command(name = "bembatch")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Run one building model against many climate files on a remote simulation engine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run each climate separately and report hours above threshold, heating and cooling
    Compact(compact::CompactArgs),

    /// Run all climates in one engine batch; results are written by the engine
    Stream(stream::StreamArgs),

    /// Summarize an NDJSON results file written by a streaming batch
    Analyze(analyze::AnalyzeArgs),

    /// Log in to the engine and save the session
    Login(login::LoginArgs),
}
