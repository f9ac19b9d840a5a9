//! # bembatch - 建筑能耗模拟批量运行工具
//!
//! 把一个建筑项目在一组气候文件上批量运行于远程模拟引擎，
//! 汇总每个气候的超温小时数与能耗。
//!
//! ## 子命令
//! - `compact` - 逐个运行并本地归约（表格 / CSV / JSON）
//! - `stream`  - 一次批量调用，结果由引擎写出
//! - `analyze` - 分析流式结果 NDJSON 文件
//! - `login`   - 登录并保存会话
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/    (装载、调度、轮询、归约、汇编)
//!   │     ├── engine/   (远程引擎接口与桥接进程)
//!   │     ├── parsers/  (EPW 头部、NDJSON 结果)
//!   │     ├── report/   (表格、CSV、JSON)
//!   │     └── models/   (数据模型)
//!   ├── utils/      (输出、进度条、会话、中断)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod engine;
mod error;
mod models;
mod parsers;
mod report;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
