//! # 进度条工具
//!
//! 封装 `indicatif` 提供统一的进度条样式，并把调度事件映射到进度条上。
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/stream.rs`, `commands/login.rs` 使用
//! - 使用 `indicatif` crate

use crate::batch::{ProgressEvent, SchedulerEvent};
use crate::utils::output;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {elapsed_precise} {msg}";

/// 创建标准进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// 创建 spinner（等待登录、启动引擎等不确定进度的任务）
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 把调度事件渲染到进度条
///
/// 逐个模式下进度条按气候计数；流式模式下按引擎报告的完成计数。
pub struct BatchProgress {
    pb: ProgressBar,
    streaming: bool,
}

impl BatchProgress {
    pub fn per_item(total: usize) -> Self {
        BatchProgress {
            pb: create_progress_bar(total as u64, "Starting..."),
            streaming: false,
        }
    }

    pub fn streaming(total: usize) -> Self {
        BatchProgress {
            pb: create_progress_bar(total as u64, "Dispatching batch..."),
            streaming: true,
        }
    }

    pub fn handle(&self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::Dispatched { name, .. } => {
                self.pb.set_message(name.clone());
            }
            SchedulerEvent::BatchDispatched { .. } => {
                self.pb.set_message("Running...");
            }
            SchedulerEvent::Progress { event, .. } => match event {
                ProgressEvent::Advanced { completed, .. } if self.streaming => {
                    self.pb.set_position(*completed);
                }
                ProgressEvent::Current { name } if self.streaming => {
                    self.pb.set_message(name.clone());
                }
                _ => {}
            },
            SchedulerEvent::Succeeded { .. } => {
                if !self.streaming {
                    self.pb.inc(1);
                }
            }
            SchedulerEvent::Failed { failure, .. } => {
                self.pb.suspend(|| output::print_run_failure(&failure.name, &failure.message));
                if !self.streaming {
                    self.pb.inc(1);
                }
            }
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
