//! # 汇总结果数据模型
//!
//! - `SummaryRow`: 单个气候的归约指标
//! - `BatchTally`: 流式批量调用返回的成功/失败名单
//! - `BatchResult`: 交给报告层的最终对象，字段名稳定，可直接序列化
//!
//! 数值在聚合前从不取整，取整只发生在 `report/` 展示时。
//!
//! ## 依赖关系
//! - 被 `batch/reducer.rs`, `batch/assembler.rs` 生成
//! - 被 `report/` 使用

use super::run::RunFailure;

use serde::{Deserialize, Serialize};

/// 单个气候的归约指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// 气候名称
    pub climate_name: String,

    /// 室内空气温度超过阈值的小时数
    pub hours_above_threshold: f64,

    /// 净供暖能耗 (kWh)：1a + 1b
    pub heating_kwh: f64,

    /// 净制冷能耗 (kWh)：3a + 3b
    pub cooling_kwh: f64,

    /// 生活热水 (kWh)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_water_kwh: Option<f64>,

    /// 电力专用：风机、水泵、照明、设备 (kWh)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electric_specific_kwh: Option<f64>,

    /// 全部类别合计 (kWh)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_kwh: Option<f64>,

    /// 楼面面积 (m²)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_area_m2: Option<f64>,

    /// 单位面积能耗 (kWh/m²)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_kwh_per_m2: Option<f64>,
}

impl SummaryRow {
    /// 是否带有详细列
    pub fn is_detailed(&self) -> bool {
        self.total_kwh.is_some()
    }
}

/// 流式批量调用的最终名单
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchTally {
    #[serde(default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

/// 批次最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// 项目模型名称
    pub model: String,

    /// ISO-8601 时间戳
    pub timestamp: String,

    /// 输入的气候数量
    pub n_simulations: usize,

    /// 成功的气候名称（派发顺序）
    pub succeeded: Vec<String>,

    /// 失败的气候名称（派发顺序）
    pub failed: Vec<String>,

    /// 失败详情
    pub failures: Vec<RunFailure>,

    /// 汇总行，仅包含成功的气候
    pub results: Vec<SummaryRow>,

    /// 是否被中断
    pub interrupted: bool,
}

impl BatchResult {
    /// 总数量
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// 查找某个气候的失败原因
    pub fn failure_for(&self, name: &str) -> Option<&RunFailure> {
        self.failures.iter().find(|f| f.name == name)
    }
}
