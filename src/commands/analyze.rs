//! # analyze 命令实现
//!
//! 读取流式批次写出的 NDJSON 文件，每行一个气候，
//! 按详细口径归约后按气候名称排序输出。
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的参数
//! - 使用 `parsers/ndjson.rs`, `batch/reducer.rs`, `report/`

use crate::batch::reducer::{self, ReductionProfile};
use crate::cli::analyze::AnalyzeArgs;
use crate::error::{BembatchError, Result};
use crate::models::SummaryRow;
use crate::parsers::ndjson::{self, StreamEntry};
use crate::report::{export, table};
use crate::utils::output;

/// 执行 analyze 命令
pub fn execute(args: AnalyzeArgs) -> Result<()> {
    output::print_header("Analyzing Streamed Results");

    if !args.ndjson_file.is_file() {
        return Err(BembatchError::FileNotFound {
            path: args.ndjson_file.display().to_string(),
        });
    }

    let entries = ndjson::parse_ndjson_file(&args.ndjson_file)?;
    output::print_info(&format!("Read {} results", entries.len()));

    let profile = ReductionProfile {
        threshold_c: args.threshold,
        ..ReductionProfile::detailed()
    };
    let rows = summarize(&entries, &profile);

    if rows.is_empty() {
        output::print_warning("No results in file");
        return Ok(());
    }

    println!("Energy demand per climate [kWh]");
    println!("{}", table::render(&rows));

    if let Some(csv_path) = &args.output {
        export::rows_to_csv(&rows, csv_path)?;
        output::print_success(&format!("Saved to: {}", csv_path.display()));
    }

    Ok(())
}

/// 归约每一行并按气候名称排序
fn summarize(entries: &[StreamEntry], profile: &ReductionProfile) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = entries
        .iter()
        .map(|e| reducer::reduce(&e.climate_name, &e.result, profile))
        .collect();
    rows.sort_by(|a, b| a.climate_name.cmp(&b.climate_name));
    rows
}
