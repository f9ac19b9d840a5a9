//! # 运行调度器
//!
//! 在一个已装载的 `BatchSession` 上按输入顺序调度模拟。两种策略：
//!
//! - 流式：一次 `start_batch`，引擎把每个结果直接写入外部汇，
//!   调度器只负责转发进度并把最终名单翻译成 `BatchResult`
//! - 逐个：每个气候一次 `start_single`，轮询到结束再派发下一个，
//!   结果在本地归约为 `SummaryRow`
//!
//! 单次运行的超时和引擎异常只记为该气候失败；会话失效与桥接故障立即中止整个批次。
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/stream.rs` 调用
//! - 使用 `batch/tracker.rs` 轮询，`batch/reducer.rs` 归约，`batch/assembler.rs` 汇编

use super::assembler::BatchAssembler;
use super::loader::BatchSession;
use super::reducer::{self, ReductionProfile};
use super::tracker::{poll_until_done, CancelToken, PollEnd, PollPolicy, ProgressEvent, ProgressTracker};
use crate::engine::{EngineError, RemoteEngine, RunOutcome};
use crate::error::{BembatchError, Result};
use crate::models::{
    BatchResult, ClimateHandle, FailureKind, ProjectModel, RawRunOutput, RunFailure, RunStatus,
    SummaryRow,
};

use std::time::{Duration, Instant};

/// 调度配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 单次运行超时
    pub per_run_timeout: Duration,
    /// 总超时在 `per_run_timeout × 数量` 之上的余量
    pub aggregate_grace: Duration,
    /// 逐个模式的轮询间隔
    pub item_poll_interval: Duration,
    /// 流式模式的轮询间隔
    pub stream_poll_interval: Duration,
    /// 归约参数
    pub profile: ReductionProfile,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            per_run_timeout: Duration::from_secs(300),
            aggregate_grace: Duration::from_secs(60),
            item_poll_interval: Duration::from_millis(500),
            stream_poll_interval: Duration::from_millis(300),
            profile: ReductionProfile::default(),
        }
    }
}

impl SchedulerConfig {
    /// 整个会话的超时，溢出时饱和为 `Duration::MAX`
    pub fn aggregate_timeout(&self, items: usize) -> Duration {
        let items = u32::try_from(items).unwrap_or(u32::MAX);
        self.per_run_timeout
            .checked_mul(items)
            .and_then(|d| d.checked_add(self.aggregate_grace))
            .unwrap_or(Duration::MAX)
    }
}

/// 从现在起 `timeout` 之后的时刻；无法表示时视为没有期限
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// 调度事件
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// 单个气候已派发（逐个模式）
    Dispatched {
        index: usize,
        total: usize,
        name: String,
    },
    /// 整个批量已派发（流式模式）
    BatchDispatched { total: usize },
    /// 轮询得到的进度
    Progress { index: usize, event: ProgressEvent },
    /// 气候成功；流式模式没有汇总行
    Succeeded {
        index: usize,
        name: String,
        row: Option<SummaryRow>,
    },
    /// 气候失败
    Failed { index: usize, failure: RunFailure },
}

/// 单次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SingleOutcome {
    Completed(RawRunOutput),
    Failed(FailureKind, String),
    Cancelled,
}

/// 运行调度器
pub struct RunScheduler {
    config: SchedulerConfig,
    cancel: CancelToken,
}

impl RunScheduler {
    pub fn new(config: SchedulerConfig, cancel: CancelToken) -> Self {
        RunScheduler { config, cancel }
    }

    /// 运行一次单气候模拟并轮询到结束
    ///
    /// 只有会话失效与桥接故障以 `Err` 返回；其余失败都落在 `SingleOutcome::Failed`。
    pub fn run_single<E, F>(
        &self,
        engine: &mut E,
        project: &ProjectModel,
        name: &str,
        climate: &ClimateHandle,
        deadline: Option<Instant>,
        on_progress: F,
    ) -> Result<SingleOutcome>
    where
        E: RemoteEngine + ?Sized,
        F: FnMut(ProgressEvent),
    {
        let ticket = match engine.start_single(project, climate) {
            Ok(ticket) => ticket,
            Err(err) => return recoverable(err),
        };

        let policy = PollPolicy::new(self.config.item_poll_interval).with_deadline(deadline);
        let mut tracker = ProgressTracker::new();
        let end = match poll_until_done(engine, ticket, policy, &self.cancel, &mut tracker, on_progress)
        {
            Ok(end) => end,
            Err(err) => {
                engine.abandon(ticket);
                return recoverable(err);
            }
        };

        Ok(match end {
            PollEnd::Done(snapshot) => match snapshot.outcome {
                Some(RunOutcome::Single(raw)) => SingleOutcome::Completed(raw),
                Some(RunOutcome::Failed(message)) => SingleOutcome::Failed(FailureKind::Engine, message),
                _ => SingleOutcome::Failed(
                    FailureKind::Engine,
                    "engine finished without a result".to_string(),
                ),
            },
            PollEnd::TimedOut => {
                engine.abandon(ticket);
                let err = BembatchError::RunTimeout {
                    name: name.to_string(),
                    seconds: self.config.per_run_timeout.as_secs(),
                };
                SingleOutcome::Failed(FailureKind::Timeout, err.to_string())
            }
            PollEnd::Cancelled => {
                engine.abandon(ticket);
                SingleOutcome::Cancelled
            }
        })
    }

    /// 逐个模式：按顺序每个气候一次运行，本地归约
    pub fn run_per_item<E, F>(
        &self,
        session: &mut BatchSession<'_, E>,
        mut on_event: F,
    ) -> Result<BatchResult>
    where
        E: RemoteEngine + ?Sized,
        F: FnMut(&SchedulerEvent),
    {
        let names = session.climate_names();
        let total = names.len();
        let project = session.project.clone();
        let handles: Vec<ClimateHandle> = session.climates.iter().map(|c| c.handle.clone()).collect();

        let mut asm = BatchAssembler::new(project.name.clone(), &names);
        let session_deadline = deadline_after(self.config.aggregate_timeout(total));

        for (index, (name, handle)) in names.iter().zip(&handles).enumerate() {
            if self.cancel.is_cancelled() {
                asm.mark_interrupted();
                report_failures(&mut asm, FailureKind::Cancelled, "interrupted before dispatch", &mut on_event)?;
                break;
            }
            if session_deadline.is_some_and(|d| Instant::now() >= d) {
                report_failures(&mut asm, FailureKind::Timeout, "session timeout exceeded before dispatch", &mut on_event)?;
                break;
            }

            asm.state_mut(index)?.start()?;
            on_event(&SchedulerEvent::Dispatched {
                index,
                total,
                name: name.clone(),
            });

            let deadline = earliest(deadline_after(self.config.per_run_timeout), session_deadline);
            let outcome = self.run_single(session.engine(), &project, name, handle, deadline, |event| {
                if let ProgressEvent::Advanced { completed, total } = event {
                    if let Ok(state) = asm.state_mut(index) {
                        state.record_progress(completed, total);
                    }
                }
                on_event(&SchedulerEvent::Progress { index, event });
            })?;

            match outcome {
                SingleOutcome::Completed(raw) => {
                    let row = reducer::reduce(name, &raw, &self.config.profile);
                    asm.state_mut(index)?.finish()?;
                    asm.push_row(row.clone());
                    on_event(&SchedulerEvent::Succeeded {
                        index,
                        name: name.clone(),
                        row: Some(row),
                    });
                }
                SingleOutcome::Failed(kind, message) => {
                    let state = asm.state_mut(index)?;
                    state.fail(kind, message)?;
                    if let Some(failure) = state.error.clone() {
                        on_event(&SchedulerEvent::Failed { index, failure });
                    }
                }
                SingleOutcome::Cancelled => {
                    asm.mark_interrupted();
                    report_failures(&mut asm, FailureKind::Cancelled, "interrupted", &mut on_event)?;
                    break;
                }
            }
        }

        asm.finish()
    }

    /// 流式模式：一次批量调用，引擎自行写出结果
    pub fn run_streaming<E, F>(
        &self,
        session: &mut BatchSession<'_, E>,
        mut on_event: F,
    ) -> Result<BatchResult>
    where
        E: RemoteEngine + ?Sized,
        F: FnMut(&SchedulerEvent),
    {
        let names = session.climate_names();
        let total = names.len();
        let project = session.project.clone();
        let climates: Vec<(String, ClimateHandle)> = session
            .climates
            .iter()
            .map(|c| (c.name.clone(), c.handle.clone()))
            .collect();

        let mut asm = BatchAssembler::new(project.name.clone(), &names);
        if self.cancel.is_cancelled() {
            asm.mark_interrupted();
            report_failures(&mut asm, FailureKind::Cancelled, "interrupted before dispatch", &mut on_event)?;
            return asm.finish();
        }

        let deadline = deadline_after(self.config.aggregate_timeout(total));
        let engine = session.engine();

        let ticket = match engine.start_batch(&project, &climates) {
            Ok(ticket) => ticket,
            Err(err) => {
                let message = fatal_or_message(err)?;
                report_failures(&mut asm, FailureKind::Invocation, &message, &mut on_event)?;
                return asm.finish();
            }
        };
        for index in 0..total {
            asm.state_mut(index)?.start()?;
        }
        on_event(&SchedulerEvent::BatchDispatched { total });

        let policy = PollPolicy::new(self.config.stream_poll_interval).with_deadline(deadline);
        let mut tracker = ProgressTracker::new();
        let end = poll_until_done(engine, ticket, policy, &self.cancel, &mut tracker, |event| {
            let index = stream_index(&asm, &event, total);
            on_event(&SchedulerEvent::Progress { index, event });
        });

        let end = match end {
            Ok(end) => end,
            Err(err) => {
                engine.abandon(ticket);
                let message = fatal_or_message(err)?;
                report_failures(&mut asm, FailureKind::Invocation, &message, &mut on_event)?;
                return asm.finish();
            }
        };

        match end {
            PollEnd::Done(snapshot) => match snapshot.outcome {
                Some(RunOutcome::Batch(tally)) => {
                    for name in &tally.succeeded {
                        let Some(index) = asm.index_of(name) else { continue };
                        let state = asm.state_mut(index)?;
                        if state.status == RunStatus::Running {
                            state.finish()?;
                            on_event(&SchedulerEvent::Succeeded {
                                index,
                                name: name.clone(),
                                row: None,
                            });
                        }
                    }
                    for name in &tally.failed {
                        let Some(index) = asm.index_of(name) else { continue };
                        let state = asm.state_mut(index)?;
                        if state.status == RunStatus::Running {
                            let reason = BembatchError::RunEngine {
                                name: name.clone(),
                                message: "reported as failed by the engine".to_string(),
                            };
                            state.fail(FailureKind::Engine, reason.to_string())?;
                            if let Some(failure) = state.error.clone() {
                                on_event(&SchedulerEvent::Failed { index, failure });
                            }
                        }
                    }
                    report_failures(&mut asm, FailureKind::Engine, "missing from engine tally", &mut on_event)?;
                }
                Some(RunOutcome::Failed(message)) => {
                    report_failures(&mut asm, FailureKind::Invocation, &message, &mut on_event)?;
                }
                _ => {
                    report_failures(&mut asm, FailureKind::Invocation, "engine finished without a tally", &mut on_event)?;
                }
            },
            PollEnd::TimedOut => {
                engine.abandon(ticket);
                report_failures(&mut asm, FailureKind::Timeout, "batch exceeded the session timeout", &mut on_event)?;
            }
            PollEnd::Cancelled => {
                engine.abandon(ticket);
                asm.mark_interrupted();
                report_failures(&mut asm, FailureKind::Cancelled, "interrupted", &mut on_event)?;
            }
        }

        asm.finish()
    }
}

/// 流式进度事件所指的输入位置
fn stream_index(asm: &BatchAssembler, event: &ProgressEvent, total: usize) -> usize {
    let last = total.saturating_sub(1);
    match event {
        ProgressEvent::Advanced { completed, .. } => usize::try_from(*completed)
            .unwrap_or(usize::MAX)
            .saturating_sub(1)
            .min(last),
        ProgressEvent::Current { name } => asm.index_of(name).unwrap_or(last),
        ProgressEvent::Finished => last,
    }
}

/// 会话失效与桥接故障是致命的，其余引擎错误只影响当前运行
fn recoverable(err: EngineError) -> Result<SingleOutcome> {
    let message = fatal_or_message(err)?;
    Ok(SingleOutcome::Failed(FailureKind::Engine, message))
}

fn fatal_or_message(err: EngineError) -> Result<String> {
    match err {
        EngineError::Session(_) | EngineError::Bridge(_) => Err(err.into()),
        EngineError::Parse(_) | EngineError::Engine(_) => Ok(err.message().to_string()),
    }
}

fn report_failures<F>(
    asm: &mut BatchAssembler,
    kind: FailureKind,
    message: &str,
    on_event: &mut F,
) -> Result<()>
where
    F: FnMut(&SchedulerEvent),
{
    for failure in asm.fail_remaining(kind, message)? {
        if let Some(index) = asm.index_of(&failure.name) {
            on_event(&SchedulerEvent::Failed { index, failure });
        }
    }
    Ok(())
}
