//! # 脚本化测试引擎
//!
//! 按气候名称预设每次运行的行为，每次 `poll` 推进一步，完全确定、无线程。
//!
//! ## 依赖关系
//! - 仅被各模块的 `#[cfg(test)]` 测试使用

use super::{
    EngineError, EngineProgress, EngineResult, EngineSnapshot, RemoteEngine, RunOutcome,
    RunTicket,
};
use crate::models::{BatchTally, ClimateHandle, ProjectModel, RawRunOutput, StepRecord};

use std::collections::{HashMap, HashSet};

/// 单次运行的预设行为
#[derive(Debug, Clone)]
pub enum Script {
    /// 经过 `polls` 次轮询后成功
    Succeed { polls: u64, output: RawRunOutput },
    /// 经过 `polls` 次轮询后引擎报错
    Fail { polls: u64, message: String },
    /// 永不完成
    Hang,
    /// 轮询时报告会话失效
    SessionLost,
}

/// 流式批量调用的预设行为
#[derive(Debug, Clone)]
pub enum BatchScript {
    /// 每次轮询完成一个条目，结束时返回名单
    Complete(BatchTally),
    /// 完成 `after` 个条目后整体失败
    Throw { after: u64, message: String },
    /// 永不完成
    Hang,
}

#[derive(Debug)]
struct ActiveRun {
    ticket: RunTicket,
    polls: u64,
    kind: ActiveKind,
}

#[derive(Debug)]
enum ActiveKind {
    Single(String),
    Batch(Vec<String>),
}

/// 脚本化引擎
#[derive(Debug)]
pub struct FakeEngine {
    pub scripts: HashMap<String, Script>,
    pub batch_script: BatchScript,
    pub bad_climates: HashSet<String>,
    pub project_error: Option<EngineError>,
    /// 按派发顺序记录的气候名称
    pub dispatched: Vec<String>,
    pub abandoned: Vec<RunTicket>,
    pub released: bool,
    pub climate_parses: usize,
    next_ticket: u64,
    handles: HashMap<String, String>,
    active: Option<ActiveRun>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        FakeEngine {
            scripts: HashMap::new(),
            batch_script: BatchScript::Complete(BatchTally::default()),
            bad_climates: HashSet::new(),
            project_error: None,
            dispatched: Vec::new(),
            abandoned: Vec::new(),
            released: false,
            climate_parses: 0,
            next_ticket: 0,
            handles: HashMap::new(),
            active: None,
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn batch(mut self, script: BatchScript) -> Self {
        self.batch_script = script;
        self
    }

    pub fn bad_climate(mut self, name: &str) -> Self {
        self.bad_climates.insert(name.to_string());
        self
    }

    fn issue_ticket(&mut self, kind: ActiveKind) -> RunTicket {
        self.next_ticket += 1;
        let ticket = RunTicket(self.next_ticket);
        self.active = Some(ActiveRun {
            ticket,
            polls: 0,
            kind,
        });
        ticket
    }

    fn name_for(&self, handle: &ClimateHandle) -> EngineResult<String> {
        self.handles
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| EngineError::Engine(format!("unknown climate {}", handle.as_str())))
    }
}

/// 一个分区、`temps.len()` 个时间步，每步 1a 供暖 `heat_w`
pub fn sample_output(temps: &[f64], heat_w: f64) -> RawRunOutput {
    let steps = temps
        .iter()
        .map(|t| StepRecord::new(*t).with_power("1a Romoppvarming", heat_w))
        .collect();
    let mut raw = RawRunOutput::default();
    raw.steps_per_zone.insert("Sone 1".to_string(), steps);
    raw
}

impl RemoteEngine for FakeEngine {
    fn parse_project(&mut self, text: &str) -> EngineResult<ProjectModel> {
        if let Some(err) = &self.project_error {
            return Err(err.clone());
        }
        Ok(ProjectModel {
            handle: "project-1".to_string(),
            name: text.lines().next().unwrap_or("Unnamed").to_string(),
            category: "Kontor".to_string(),
            zone_count: 1,
        })
    }

    fn parse_climate(&mut self, name: &str, _text: &str) -> EngineResult<ClimateHandle> {
        self.climate_parses += 1;
        if self.bad_climates.contains(name) {
            return Err(EngineError::Parse(format!("malformed EPW for {}", name)));
        }
        let handle = format!("climate-{}", self.climate_parses);
        self.handles.insert(handle.clone(), name.to_string());
        Ok(ClimateHandle(handle))
    }

    fn start_single(
        &mut self,
        _project: &ProjectModel,
        climate: &ClimateHandle,
    ) -> EngineResult<RunTicket> {
        let name = self.name_for(climate)?;
        self.dispatched.push(name.clone());
        Ok(self.issue_ticket(ActiveKind::Single(name)))
    }

    fn start_batch(
        &mut self,
        _project: &ProjectModel,
        climates: &[(String, ClimateHandle)],
    ) -> EngineResult<RunTicket> {
        let names: Vec<String> = climates.iter().map(|(n, _)| n.clone()).collect();
        self.dispatched.extend(names.iter().cloned());
        Ok(self.issue_ticket(ActiveKind::Batch(names)))
    }

    fn poll(&mut self, ticket: RunTicket) -> EngineResult<EngineSnapshot> {
        let active = match self.active.as_mut() {
            Some(active) if active.ticket == ticket => active,
            _ => return Ok(EngineSnapshot::default()),
        };
        active.polls += 1;
        let polls = active.polls;

        match &active.kind {
            ActiveKind::Single(name) => {
                let script = self.scripts.get(name).cloned().unwrap_or(Script::Succeed {
                    polls: 1,
                    output: RawRunOutput::default(),
                });
                let (done, target, outcome) = match script {
                    Script::Succeed { polls: n, output } => {
                        (polls >= n, n, Some(RunOutcome::Single(output)))
                    }
                    Script::Fail { polls: n, message } => {
                        (polls >= n, n, Some(RunOutcome::Failed(message)))
                    }
                    Script::Hang => (false, 0, None),
                    Script::SessionLost => {
                        return Err(EngineError::Session("authorization expired".to_string()))
                    }
                };
                Ok(EngineSnapshot {
                    done,
                    progress: EngineProgress {
                        completed: polls.min(target),
                        total: target,
                        name: name.clone(),
                    },
                    outcome: if done { outcome } else { None },
                })
            }
            ActiveKind::Batch(names) => {
                let total = names.len() as u64;
                let completed = polls.min(total);
                let current = names
                    .get(completed.saturating_sub(1) as usize)
                    .cloned()
                    .unwrap_or_default();
                let mut snapshot = EngineSnapshot {
                    done: false,
                    progress: EngineProgress {
                        completed,
                        total,
                        name: current,
                    },
                    outcome: None,
                };
                match &self.batch_script {
                    BatchScript::Complete(tally) => {
                        if polls > total {
                            snapshot.done = true;
                            snapshot.progress.name = "Ferdig".to_string();
                            snapshot.outcome = Some(RunOutcome::Batch(tally.clone()));
                        }
                    }
                    BatchScript::Throw { after, message } => {
                        if polls > *after {
                            snapshot.done = true;
                            snapshot.progress.completed = (*after).min(total);
                            snapshot.outcome = Some(RunOutcome::Failed(message.clone()));
                        }
                    }
                    BatchScript::Hang => {
                        snapshot.progress.completed = 0;
                    }
                }
                Ok(snapshot)
            }
        }
    }

    fn abandon(&mut self, ticket: RunTicket) {
        self.abandoned.push(ticket);
        if self.active.as_ref().map(|a| a.ticket) == Some(ticket) {
            self.active = None;
        }
    }

    fn release(&mut self) {
        self.released = true;
        self.handles.clear();
        self.active = None;
    }
}
