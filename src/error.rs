//! # 统一错误处理模块
//!
//! 定义 bembatch 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 输入错误：无气候文件、项目/气候解析失败、重名，致命，任何运行开始前中止
//! - 会话错误：授权失效，中止当前批次，调用方重新登录后整体重试
//! - 单次运行错误（超时、引擎异常）：不在此处传播，记录到 `RunState`
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// bembatch 统一错误类型
#[derive(Error, Debug)]
pub enum BembatchError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 输入错误
    // ─────────────────────────────────────────────────────────────
    #[error("No climate datasets given")]
    EmptyInput,

    #[error("No .epw files found in {path}")]
    NoClimateFiles { path: String },

    #[error("Climate name '{name}' appears more than once; results could not be attributed")]
    DuplicateClimateName { name: String },

    #[error("Failed to parse project definition\nReason: {reason}")]
    ProjectParse { reason: String },

    #[error("Failed to parse climate dataset '{name}'\nReason: {reason}")]
    ClimateParse { name: String, reason: String },

    #[error("Failed to parse {format} line {line}\nReason: {reason}")]
    ParseError {
        format: String,
        line: usize,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 会话与引擎错误
    // ─────────────────────────────────────────────────────────────
    #[error("Engine session expired: {0}")]
    SessionExpired(String),

    #[error("Engine bridge failed: {0}")]
    Bridge(String),

    #[error("Run for '{name}' exceeded {seconds} s")]
    RunTimeout { name: String, seconds: u64 },

    #[error("Engine failed on '{name}': {message}")]
    RunEngine { name: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BembatchError {
    /// 是否为可通过重新登录恢复的会话错误
    pub fn is_session_expired(&self) -> bool {
        matches!(self, BembatchError::SessionExpired(_))
    }

    /// 是否为输入错误（在任何运行开始前中止）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BembatchError::EmptyInput
                | BembatchError::NoClimateFiles { .. }
                | BembatchError::DuplicateClimateName { .. }
                | BembatchError::ProjectParse { .. }
                | BembatchError::ClimateParse { .. }
                | BembatchError::FileNotFound { .. }
                | BembatchError::DirectoryNotFound { .. }
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BembatchError>;
