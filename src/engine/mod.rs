//! # 远程引擎抽象
//!
//! 远程模拟引擎原本以回调方式推送进度；这里把它反转为轮询接口：
//! 派发一次运行得到 `RunTicket`，之后按需调用 `poll` 取状态快照。
//! 推送式传输（例如桥接进程把回调写入状态槽）和轮询式传输都可以实现同一个 trait。
//!
//! ## 依赖关系
//! - 被 `batch/loader.rs`, `batch/scheduler.rs`, `batch/tracker.rs` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: bridge（外部桥接进程）, fake（测试用脚本化引擎）

pub mod bridge;
#[cfg(test)]
pub mod fake;

pub use bridge::{BridgeConfig, BridgeEngine};

use crate::error::BembatchError;
use crate::models::{BatchTally, ClimateHandle, ProjectModel, RawRunOutput};

use serde::{Deserialize, Serialize};

/// 一次派发的标识，用于丢弃已放弃运行的迟到结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunTicket(pub u64);

/// 引擎报告的进度计数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineProgress {
    #[serde(default, rename = "current")]
    pub completed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub name: String,
}

/// 运行的终态
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// 单次模拟的原始输出
    Single(RawRunOutput),
    /// 流式批量调用的名单
    Batch(BatchTally),
    /// 引擎抛出的错误信息
    Failed(String),
}

/// 某一时刻的远程执行状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub done: bool,
    pub progress: EngineProgress,
    pub outcome: Option<RunOutcome>,
}

/// 引擎错误类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 输入文本无法解析
    Parse(String),
    /// 引擎内部故障
    Engine(String),
    /// 授权失效，需要重新登录后整体重试
    Session(String),
    /// 与桥接进程通信失败
    Bridge(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Parse(msg) => write!(f, "parse error: {}", msg),
            EngineError::Engine(msg) => write!(f, "engine error: {}", msg),
            EngineError::Session(msg) => write!(f, "session error: {}", msg),
            EngineError::Bridge(msg) => write!(f, "bridge error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    pub fn message(&self) -> &str {
        match self {
            EngineError::Parse(msg)
            | EngineError::Engine(msg)
            | EngineError::Session(msg)
            | EngineError::Bridge(msg) => msg,
        }
    }
}

/// 会话错误和桥接错误总是致命的；其余情况由调用方按上下文转换
impl From<EngineError> for BembatchError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Session(msg) => BembatchError::SessionExpired(msg),
            EngineError::Bridge(msg) => BembatchError::Bridge(msg),
            EngineError::Parse(msg) | EngineError::Engine(msg) => BembatchError::Internal(msg),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// 远程模拟引擎
///
/// 同一实例同一时间只执行一个运行；调用方负责串行化。
pub trait RemoteEngine {
    /// 解析项目定义文本，结果保存在引擎上下文中
    fn parse_project(&mut self, text: &str) -> EngineResult<ProjectModel>;

    /// 解析一个气候数据集
    fn parse_climate(&mut self, name: &str, text: &str) -> EngineResult<ClimateHandle>;

    /// 派发一次单气候模拟
    fn start_single(
        &mut self,
        project: &ProjectModel,
        climate: &ClimateHandle,
    ) -> EngineResult<RunTicket>;

    /// 派发流式批量模拟，引擎自行把每个结果写入外部汇
    fn start_batch(
        &mut self,
        project: &ProjectModel,
        climates: &[(String, ClimateHandle)],
    ) -> EngineResult<RunTicket>;

    /// 读取指定运行的当前状态
    fn poll(&mut self, ticket: RunTicket) -> EngineResult<EngineSnapshot>;

    /// 放弃一个运行（尽力而为，引擎不保证停止计算）
    fn abandon(&mut self, ticket: RunTicket);

    /// 释放已加载的项目与气候
    fn release(&mut self);
}
