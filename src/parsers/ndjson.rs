//! # 流式结果 NDJSON 解析
//!
//! 流式批量模式下，引擎每完成一个气候就向外部文件追加一行：
//!
//! ```text
//! {"climateName":"Oslo","result":{"stepResultsPerSone":{...},"varmetapstallPerSone":[...]}}
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 使用
//! - 使用 `models/run.rs` 的 RawRunOutput

use super::read_text_lossy;
use crate::error::{BembatchError, Result};
use crate::models::RawRunOutput;

use serde::Deserialize;
use std::path::Path;

/// NDJSON 中的一行
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEntry {
    #[serde(rename = "climateName", default = "unknown_climate")]
    pub climate_name: String,

    #[serde(default)]
    pub result: RawRunOutput,
}

fn unknown_climate() -> String {
    "Unknown".to_string()
}

/// 解析 NDJSON 文件
pub fn parse_ndjson_file(path: &Path) -> Result<Vec<StreamEntry>> {
    let content = read_text_lossy(path)?;
    parse_ndjson_content(&content)
}

/// 从字符串内容解析 NDJSON，跳过空行
pub fn parse_ndjson_content(content: &str) -> Result<Vec<StreamEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| BembatchError::ParseError {
                format: "ndjson".to_string(),
                line: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}
