//! # 解析器模块
//!
//! 解析本地输入文件：EPW 气候文件头部和流式结果 NDJSON 文件。
//! 项目与气候的完整解析由远程引擎完成，这里只读取命名所需的字段。
//!
//! ## 依赖关系
//! - 被 `batch/loader.rs` 和 `commands/analyze.rs` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: epw, ndjson

pub mod epw;
pub mod ndjson;

use crate::error::{BembatchError, Result};
use std::fs;
use std::path::Path;

/// 以 UTF-8 读取文本文件，非法字节替换为 U+FFFD
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| BembatchError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
