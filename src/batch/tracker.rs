//! # 进度跟踪器
//!
//! 协作式轮询：派发之后按固定间隔读取远程执行状态快照，直到 done 标志置位。
//!
//! ## 功能
//! - 把快照翻译为面向用户的进度事件
//! - 完成计数单调不减，回退的计数视为过期快照忽略
//! - 每个轮询边界检查中断标志与截止时间
//!
//! ## 依赖关系
//! - 被 `batch/scheduler.rs` 调用
//! - 使用 `engine::RemoteEngine`

use crate::engine::{EngineResult, EngineSnapshot, RemoteEngine, RunTicket};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 引擎在批量结束时报告的当前条目名称，不是真正的气候
const FINISHED_MARKER: &str = "Ferdig";

/// 外部中断标志
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 完成计数前进
    Advanced { completed: u64, total: u64 },
    /// 引擎开始处理新的条目
    Current { name: String },
    /// 运行到达终态
    Finished,
}

/// 快照 → 事件翻译器
#[derive(Debug, Default)]
pub struct ProgressTracker {
    completed: u64,
    total: u64,
    current: String,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 迄今观察到的最大完成计数
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// 观察一个快照，返回新产生的事件
    pub fn observe(&mut self, snapshot: &EngineSnapshot) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        let progress = &snapshot.progress;

        if progress.total > self.total {
            self.total = progress.total;
        }
        if progress.completed > self.completed {
            self.completed = progress.completed;
            events.push(ProgressEvent::Advanced {
                completed: self.completed,
                total: self.total,
            });
        }

        let name = progress.name.as_str();
        if !name.is_empty() && name != FINISHED_MARKER && name != self.current {
            self.current = name.to_string();
            events.push(ProgressEvent::Current {
                name: self.current.clone(),
            });
        }

        if snapshot.done && !self.finished {
            self.finished = true;
            events.push(ProgressEvent::Finished);
        }

        events
    }
}

/// 轮询策略
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// 两次轮询之间的间隔
    pub interval: Duration,
    /// 截止时间；超过后返回 `TimedOut`
    pub deadline: Option<Instant>,
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        PollPolicy {
            interval,
            deadline: None,
        }
    }

    /// `None` 表示不设截止时间
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// 下一次等待时长：不超过间隔，也不越过截止时间
    fn next_wait(&self, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => self.interval.min(deadline.saturating_duration_since(now)),
            None => self.interval,
        }
    }

    fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

/// 轮询结束原因
#[derive(Debug, Clone, PartialEq)]
pub enum PollEnd {
    /// 运行到达终态
    Done(EngineSnapshot),
    /// 截止时间已过
    TimedOut,
    /// 外部中断
    Cancelled,
}

/// 轮询直到运行结束、超时或被中断
pub fn poll_until_done<E, F>(
    engine: &mut E,
    ticket: RunTicket,
    policy: PollPolicy,
    cancel: &CancelToken,
    tracker: &mut ProgressTracker,
    mut on_event: F,
) -> EngineResult<PollEnd>
where
    E: RemoteEngine + ?Sized,
    F: FnMut(ProgressEvent),
{
    loop {
        let wait = policy.next_wait(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }

        if cancel.is_cancelled() {
            return Ok(PollEnd::Cancelled);
        }

        let snapshot = engine.poll(ticket)?;
        for event in tracker.observe(&snapshot) {
            on_event(event);
        }

        if snapshot.done {
            return Ok(PollEnd::Done(snapshot));
        }
        if policy.expired(Instant::now()) {
            return Ok(PollEnd::TimedOut);
        }
    }
}
