//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `engine/`, `report/`, `utils/`
//! - 子模块: analyze, compact, connect, login, stream

pub mod analyze;
pub mod compact;
pub mod connect;
pub mod login;
pub mod stream;

use crate::batch::{self, ClimateInput};
use crate::cli::Commands;
use crate::error::{BembatchError, Result};
use crate::parsers;
use crate::utils::output;

use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Compact(args) => compact::execute(args),
        Commands::Stream(args) => stream::execute(args),
        Commands::Analyze(args) => analyze::execute(args),
        Commands::Login(args) => login::execute(args),
    }
}

/// 读取项目文件与气候目录
pub(crate) fn load_inputs(
    project: &Path,
    climate_dir: &Path,
    pattern: &str,
) -> Result<(String, Vec<ClimateInput>)> {
    if !project.is_file() {
        return Err(BembatchError::FileNotFound {
            path: project.display().to_string(),
        });
    }

    let files = batch::collect_climate_files(climate_dir, pattern)?;
    output::print_info(&format!("Found {} climate files", files.len()));

    output::print_info(&format!("Reading project: {}", project.display()));
    let project_text = parsers::read_text_lossy(project)?;

    let inputs = batch::read_climate_inputs(&files)?;
    for input in &inputs {
        let file_name = input
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("    {} -> {}", file_name, input.name);
    }

    Ok((project_text, inputs))
}
