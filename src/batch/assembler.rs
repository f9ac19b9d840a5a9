//! # 批次结果汇编
//!
//! 持有每个气候的 `RunState` 与已归约的 `SummaryRow`，最后合并为 `BatchResult`。
//!
//! ## 不变量
//! - 成功名单 ∪ 失败名单 = 全部输入名称，且互不相交
//! - 汇总行只对应成功的气候，按派发顺序排列
//! - 失败的气候即使没有汇总行也保留名称与原因
//!
//! ## 依赖关系
//! - 被 `batch/scheduler.rs` 使用
//! - 使用 `chrono` 生成时间戳

use crate::error::{BembatchError, Result};
use crate::models::{BatchResult, FailureKind, RunFailure, RunState, RunStatus, SummaryRow};

use chrono::Local;

/// 批次结果汇编器
#[derive(Debug)]
pub struct BatchAssembler {
    model: String,
    states: Vec<RunState>,
    rows: Vec<SummaryRow>,
    interrupted: bool,
    timestamp: Option<String>,
}

impl BatchAssembler {
    /// 为每个名称创建 pending 状态
    pub fn new(model: impl Into<String>, names: &[String]) -> Self {
        BatchAssembler {
            model: model.into(),
            states: names.iter().map(RunState::new).collect(),
            rows: Vec::new(),
            interrupted: false,
            timestamp: None,
        }
    }

    /// 固定时间戳
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn state_mut(&mut self, index: usize) -> Result<&mut RunState> {
        self.states
            .get_mut(index)
            .ok_or_else(|| BembatchError::Internal(format!("no run state at index {}", index)))
    }

    /// 按名称查找（流式名单按名称回报）
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    pub fn push_row(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// 把所有尚未终结的状态标记为失败，返回新产生的失败记录
    pub fn fail_remaining(&mut self, kind: FailureKind, message: &str) -> Result<Vec<RunFailure>> {
        let mut failures = Vec::new();
        for state in self.states.iter_mut().filter(|s| !s.status.is_terminal()) {
            state.fail(kind, message)?;
            failures.extend(state.error.clone());
        }
        Ok(failures)
    }

    /// 生成最终结果
    pub fn finish(self) -> Result<BatchResult> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut failures = Vec::new();

        for state in &self.states {
            match state.status {
                RunStatus::Done => succeeded.push(state.name.clone()),
                RunStatus::Failed => {
                    failed.push(state.name.clone());
                    if let Some(failure) = &state.error {
                        failures.push(failure.clone());
                    }
                }
                status => {
                    return Err(BembatchError::Internal(format!(
                        "run '{}' still {} when assembling results",
                        state.name, status
                    )))
                }
            }
        }

        if let Some(row) = self
            .rows
            .iter()
            .find(|r| !succeeded.contains(&r.climate_name))
        {
            return Err(BembatchError::Internal(format!(
                "summary row for '{}' has no successful run",
                row.climate_name
            )));
        }

        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());

        Ok(BatchResult {
            model: self.model,
            timestamp,
            n_simulations: self.states.len(),
            succeeded,
            failed,
            failures,
            results: self.rows,
            interrupted: self.interrupted,
        })
    }
}
