//! # 运行状态与原始输出模型
//!
//! - `RunState`: 每个气候一条，状态只能前进（pending → running → done | failed）
//! - `StepRecord` / `RawRunOutput`: 引擎返回的逐时间步、逐分区记录
//!
//! ## 依赖关系
//! - 被 `batch/scheduler.rs`, `batch/reducer.rs`, `batch/assembler.rs` 使用
//! - 被 `parsers/ndjson.rs` 反序列化

use crate::error::{BembatchError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Done => write!(f, "done"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 失败原因分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 单次运行超时
    Timeout,
    /// 引擎计算抛出异常
    Engine,
    /// 整个批量调用失败
    Invocation,
    /// 被用户中断，未完成
    Cancelled,
}

/// 单个气候的失败记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// 单个气候的运行状态
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub name: String,
    pub status: RunStatus,
    pub completed_steps: u64,
    pub total_steps: u64,
    pub error: Option<RunFailure>,
}

impl RunState {
    pub fn new(name: impl Into<String>) -> Self {
        RunState {
            name: name.into(),
            status: RunStatus::Pending,
            completed_steps: 0,
            total_steps: 0,
            error: None,
        }
    }

    /// pending → running
    pub fn start(&mut self) -> Result<()> {
        self.transition(RunStatus::Running)
    }

    /// running → done
    pub fn finish(&mut self) -> Result<()> {
        self.transition(RunStatus::Done)
    }

    /// pending | running → failed
    ///
    /// pending 直接失败只用于从未派发的条目（整体调用失败、总超时、中断）。
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) -> Result<()> {
        self.transition(RunStatus::Failed)?;
        self.error = Some(RunFailure {
            name: self.name.clone(),
            kind,
            message: message.into(),
        });
        Ok(())
    }

    /// 更新步数计数（只增不减）
    pub fn record_progress(&mut self, completed: u64, total: u64) {
        self.completed_steps = self.completed_steps.max(completed);
        self.total_steps = self.total_steps.max(total);
    }

    fn transition(&mut self, next: RunStatus) -> Result<()> {
        let allowed = match (self.status, next) {
            (RunStatus::Pending, RunStatus::Running) => true,
            (RunStatus::Running, RunStatus::Done) => true,
            (RunStatus::Pending | RunStatus::Running, RunStatus::Failed) => true,
            _ => false,
        };
        if !allowed {
            return Err(self.illegal(next));
        }
        self.status = next;
        Ok(())
    }

    fn illegal(&self, next: RunStatus) -> BembatchError {
        BembatchError::Internal(format!(
            "run '{}' cannot move from {} to {}",
            self.name, self.status, next
        ))
    }
}

// ─────────────────────────────────────────────────────────────
// 引擎原始输出
// ─────────────────────────────────────────────────────────────

/// 室内气候
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndoorClimate {
    /// 室内空气温度 (°C)
    #[serde(rename = "luftTemperatur", default)]
    pub air_temperature: f64,
}

/// 一个分区在一个时间步的记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "inneklima", default)]
    pub indoor: IndoorClimate,

    /// 能耗类别标签 → 平均功率 (W)
    #[serde(rename = "effektBehov", default)]
    pub power_demand: BTreeMap<String, f64>,
}

impl StepRecord {
    pub fn new(air_temperature: f64) -> Self {
        StepRecord {
            indoor: IndoorClimate { air_temperature },
            power_demand: BTreeMap::new(),
        }
    }

    pub fn with_power(mut self, label: &str, watts: f64) -> Self {
        self.power_demand.insert(label.to_string(), watts);
        self
    }

    pub fn air_temperature(&self) -> f64 {
        self.indoor.air_temperature
    }
}

/// 分区元数据（热损失数表）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneMetadata {
    /// 楼面面积 (m²)
    #[serde(rename = "areal", default)]
    pub area: f64,
}

/// 一次运行的原始输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRunOutput {
    /// 分区名 → 逐时间步记录
    #[serde(rename = "stepResultsPerSone", default)]
    pub steps_per_zone: BTreeMap<String, Vec<StepRecord>>,

    #[serde(rename = "varmetapstallPerSone", default)]
    pub zone_metadata: Vec<ZoneMetadata>,
}

impl RawRunOutput {
    /// 所有分区的时间步记录
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps_per_zone.values().flatten()
    }

    pub fn step_count(&self) -> usize {
        self.steps_per_zone.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_happy_path() {
        let mut state = RunState::new("Oslo");
        assert_eq!(state.status, RunStatus::Pending);
        state.start().unwrap();
        state.finish().unwrap();
        assert_eq!(state.status, RunStatus::Done);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_run_state_never_reverts() {
        let mut state = RunState::new("Bergen");
        state.start().unwrap();
        state.fail(FailureKind::Engine, "boom").unwrap();

        assert!(state.start().is_err());
        assert!(state.finish().is_err());
        assert!(state.fail(FailureKind::Timeout, "again").is_err());
        assert_eq!(state.error.as_ref().unwrap().message, "boom");
    }

    #[test]
    fn test_pending_cannot_finish() {
        let mut state = RunState::new("Tromsø");
        assert!(state.finish().is_err());
        // 未派发条目可以直接失败
        state.fail(FailureKind::Cancelled, "interrupted").unwrap();
        assert_eq!(state.status, RunStatus::Failed);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = RunState::new("Bodø");
        state.record_progress(5, 10);
        state.record_progress(3, 10);
        assert_eq!(state.completed_steps, 5);
    }

    #[test]
    fn test_raw_output_from_engine_json() {
        let json = r#"{
            "stepResultsPerSone": {
                "Sone 1": [
                    {"inneklima": {"luftTemperatur": 27.0}, "effektBehov": {"1a Romoppvarming": 100.0}},
                    {"inneklima": {"luftTemperatur": 21.0}, "effektBehov": {}}
                ]
            },
            "varmetapstallPerSone": [{"areal": 120.5}]
        }"#;
        let raw: RawRunOutput = serde_json::from_str(json).unwrap();
        assert_eq!(raw.step_count(), 2);
        assert_eq!(raw.zone_metadata[0].area, 120.5);
        let first = raw.steps().next().unwrap();
        assert_eq!(first.air_temperature(), 27.0);
    }
}
