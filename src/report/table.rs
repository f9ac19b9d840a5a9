//! # 终端表格
//!
//! 把汇总行渲染为 `tabled` 表格。数值只在这里四舍五入到一位小数。
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/analyze.rs` 调用
//! - 使用 `tabled`

use crate::models::SummaryRow;

use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct CompactLine {
    #[tabled(rename = "Climate")]
    climate: String,
    #[tabled(rename = "Hours > threshold")]
    hours: String,
    #[tabled(rename = "Heating (kWh)")]
    heating: String,
    #[tabled(rename = "Cooling (kWh)")]
    cooling: String,
}

#[derive(Debug, Clone, Tabled)]
struct DetailedLine {
    #[tabled(rename = "Climate")]
    climate: String,
    #[tabled(rename = "Hours > threshold")]
    hours: String,
    #[tabled(rename = "Heating (kWh)")]
    heating: String,
    #[tabled(rename = "Cooling (kWh)")]
    cooling: String,
    #[tabled(rename = "Hot water (kWh)")]
    hot_water: String,
    #[tabled(rename = "El. specific (kWh)")]
    electric: String,
    #[tabled(rename = "Total (kWh)")]
    total: String,
    #[tabled(rename = "kWh/m²")]
    intensity: String,
}

fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

fn optional(value: Option<f64>) -> String {
    value.map(one_decimal).unwrap_or_else(|| "-".to_string())
}

/// 渲染表格；任一行带有详细字段时使用详细列
pub fn render(rows: &[SummaryRow]) -> String {
    if rows.iter().any(SummaryRow::is_detailed) {
        let lines: Vec<DetailedLine> = rows
            .iter()
            .map(|r| DetailedLine {
                climate: r.climate_name.clone(),
                hours: one_decimal(r.hours_above_threshold),
                heating: one_decimal(r.heating_kwh),
                cooling: one_decimal(r.cooling_kwh),
                hot_water: optional(r.hot_water_kwh),
                electric: optional(r.electric_specific_kwh),
                total: optional(r.total_kwh),
                intensity: optional(r.intensity_kwh_per_m2),
            })
            .collect();
        Table::new(&lines).to_string()
    } else {
        let lines: Vec<CompactLine> = rows
            .iter()
            .map(|r| CompactLine {
                climate: r.climate_name.clone(),
                hours: one_decimal(r.hours_above_threshold),
                heating: one_decimal(r.heating_kwh),
                cooling: one_decimal(r.cooling_kwh),
            })
            .collect();
        Table::new(&lines).to_string()
    }
}
