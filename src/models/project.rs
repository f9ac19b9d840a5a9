//! # 项目与气候数据模型
//!
//! 引擎解析后的项目模型和气候数据集。两者在一个批次内不可变，
//! 由 `batch::BatchSession` 独占持有。
//!
//! ## 依赖关系
//! - 被 `engine/` 生成
//! - 被 `batch/loader.rs`, `batch/scheduler.rs` 使用

use serde::{Deserialize, Serialize};

/// 已解析的建筑/分区定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectModel {
    /// 引擎侧的不透明句柄
    pub handle: String,

    /// 显示名称
    pub name: String,

    /// 建筑类别
    pub category: String,

    /// 分区数量
    pub zone_count: usize,
}

impl std::fmt::Display for ProjectModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (category: {}, zones: {})",
            self.name, self.category, self.zone_count
        )
    }
}

/// 引擎侧已解析气候数据的不透明句柄
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClimateHandle(pub String);

impl ClimateHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 气候数据集
#[derive(Debug, Clone)]
pub struct ClimateDataset {
    /// 逻辑标识（EPW LOCATION 或文件名）
    pub name: String,

    /// 原始 EPW 文本
    pub raw_content: String,

    /// 引擎句柄
    pub handle: ClimateHandle,
}
