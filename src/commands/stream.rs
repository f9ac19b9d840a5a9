//! # stream 命令实现
//!
//! 流式模式：一次批量调用，引擎在浏览器中询问保存位置并把每个结果
//! 逐行写入该文件；这里只显示进度并报告成功/失败名单。
//!
//! ## 依赖关系
//! - 使用 `cli/stream.rs` 定义的参数
//! - 使用 `batch/`, `commands/connect.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/signal.rs`

use super::connect;
use crate::batch::{self, CancelToken, RunScheduler, SchedulerConfig};
use crate::cli::stream::StreamArgs;
use crate::error::{BembatchError, Result};
use crate::utils::progress::BatchProgress;
use crate::utils::{output, signal};

use std::time::{Duration, Instant};

/// 执行 stream 命令
pub fn execute(args: StreamArgs) -> Result<()> {
    output::print_header("Streaming Batch Simulation");

    if !args.engine.headed {
        return Err(BembatchError::InvalidArgument(
            "streaming mode needs --headed: the engine asks where to save results".to_string(),
        ));
    }

    let (project_text, inputs) = super::load_inputs(&args.project, &args.climate_dir, &args.pattern)?;

    let config = SchedulerConfig {
        per_run_timeout: Duration::from_secs(args.timeout),
        stream_poll_interval: Duration::from_millis(args.poll_ms),
        ..SchedulerConfig::default()
    };

    output::print_separator();
    output::print_info(&format!("Engine URL: {}", args.engine.url));
    output::print_info(&format!("Simulations: {} climate files", inputs.len()));
    output::print_info(&format!(
        "Session timeout: {} s",
        config.aggregate_timeout(inputs.len()).as_secs()
    ));
    output::print_separator();

    let cancel = CancelToken::new();
    signal::watch_ctrl_c(cancel.clone());
    let scheduler = RunScheduler::new(config, cancel);

    let started = Instant::now();
    let result = connect::with_session(&args.engine, |engine| {
        let mut session = batch::stage(engine, &project_text, &inputs)?;
        output::print_info("Choose where to save the results in the browser window");

        let bar = BatchProgress::streaming(session.len());
        let result = scheduler.run_streaming(&mut session, |event| bar.handle(event));
        bar.finish();
        result
    })?;
    let elapsed = started.elapsed();

    output::print_separator();
    if !result.failed.is_empty() {
        output::print_warning(&format!("Failed simulations: {}", result.failed.join(", ")));
    }
    output::print_info(&format!(
        "Succeeded: {}/{}",
        result.succeeded.len(),
        result.total()
    ));
    output::print_tally(result.succeeded.len(), result.failed.len(), elapsed);
    if result.interrupted {
        output::print_warning("Batch was interrupted; unfinished climates are listed as failed");
    } else {
        output::print_info("Results were saved to the file chosen in the browser");
    }

    Ok(())
}
