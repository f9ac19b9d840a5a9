//! # compact 命令实现
//!
//! 逐个模式：每个气候一次运行，在本地把逐步输出归约为
//! 超温小时数、供暖能耗、制冷能耗三项指标。
//!
//! ## 功能
//! - 装载项目与全部气候，任一解析失败立即中止
//! - 按顺序运行，单次超时或引擎异常只记为该气候失败
//! - Ctrl-C 中断后保留已完成的结果
//! - 输出表格、CSV（可选）与 JSON
//!
//! ## 依赖关系
//! - 使用 `cli/compact.rs` 定义的参数
//! - 使用 `batch/`, `commands/connect.rs`, `report/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/signal.rs`

use super::connect;
use crate::batch::{self, CancelToken, ReductionProfile, RunScheduler, SchedulerConfig};
use crate::cli::compact::CompactArgs;
use crate::error::Result;
use crate::models::BatchResult;
use crate::report::{export, table};
use crate::utils::progress::BatchProgress;
use crate::utils::{output, signal};

use std::time::{Duration, Instant};

/// 执行 compact 命令
pub fn execute(args: CompactArgs) -> Result<()> {
    output::print_header("Compact Batch Simulation");


    let (project_text, inputs) = super::load_inputs(&args.project, &args.climate_dir, &args.pattern)?;

    let config = SchedulerConfig {
        per_run_timeout: Duration::from_secs(args.timeout),
        item_poll_interval: Duration::from_millis(args.poll_ms),
        profile: ReductionProfile {
            threshold_c: args.threshold,
            ..ReductionProfile::default()
        },
        ..SchedulerConfig::default()
    };

    output::print_separator();
    output::print_info(&format!("Engine URL: {}", args.engine.url));
    output::print_info(&format!("Simulations: {} climate files", inputs.len()));
    output::print_info(&format!(
        "Output: hours > {:.1}°C, heating energy, cooling energy",
        args.threshold
    ));
    output::print_separator();

    let cancel = CancelToken::new();
    signal::watch_ctrl_c(cancel.clone());
    let scheduler = RunScheduler::new(config, cancel);

    let started = Instant::now();
    let result = connect::with_session(&args.engine, |engine| {
        let mut session = batch::stage(engine, &project_text, &inputs)?;
        output::print_info(&format!(
            "Project: {} ({}, {} zones)",
            session.project.name, session.project.category, session.project.zone_count
        ));

        let bar = BatchProgress::per_item(session.len());
        let result = scheduler.run_per_item(&mut session, |event| bar.handle(event));
        bar.finish();
        result
    })?;
    let elapsed = started.elapsed();

    write_report(&result, &args)?;
    output::print_tally(result.succeeded.len(), result.failed.len(), elapsed);
    if result.interrupted {
        output::print_warning("Batch was interrupted; unfinished climates are listed as failed");
    }

    Ok(())
}

fn write_report(result: &BatchResult, args: &CompactArgs) -> Result<()> {
    output::print_header(&format!("Results for: {}", result.model));

    if result.results.is_empty() {
        output::print_warning("No simulation produced results");
    } else {
        println!("{}", table::render(&result.results));
    }

    if !result.failed.is_empty() {
        println!();
        for failure in &result.failures {
            output::print_run_failure(&failure.name, &failure.message);
        }
    }

    if let Some(csv_path) = &args.output {
        export::rows_to_csv(&result.results, csv_path)?;
        output::print_success(&format!("Saved CSV to: {}", csv_path.display()));
    }

    let json_path = export::json_path_for(args.output.as_deref());
    export::result_to_json(result, &json_path)?;
    output::print_success(&format!("Saved JSON to: {}", json_path.display()));

    Ok(())
}
