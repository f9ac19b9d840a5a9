//! # 结果导出
//!
//! - CSV: 每个成功气候一行，保留完整精度
//! - JSON: 完整的 `BatchResult`（包括失败名单与原因）
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/analyze.rs` 调用
//! - 使用 `csv` 与 `serde_json`

use crate::error::{BembatchError, Result};
use crate::models::{BatchResult, SummaryRow};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const COMPACT_HEADER: [&str; 4] = [
    "climate_name",
    "hours_above_threshold",
    "heating_kwh",
    "cooling_kwh",
];

const DETAILED_HEADER: [&str; 5] = [
    "hot_water_kwh",
    "electric_specific_kwh",
    "total_kwh",
    "floor_area_m2",
    "intensity_kwh_per_m2",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// 导出汇总行为 CSV
pub fn rows_to_csv(rows: &[SummaryRow], output_path: &Path) -> Result<()> {
    let detailed = rows.iter().any(SummaryRow::is_detailed);
    let mut wtr = csv::Writer::from_path(output_path)?;

    let mut header: Vec<&str> = COMPACT_HEADER.to_vec();
    if detailed {
        header.extend(DETAILED_HEADER);
    }
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.climate_name.clone(),
            row.hours_above_threshold.to_string(),
            row.heating_kwh.to_string(),
            row.cooling_kwh.to_string(),
        ];
        if detailed {
            record.extend([
                cell(row.hot_water_kwh),
                cell(row.electric_specific_kwh),
                cell(row.total_kwh),
                cell(row.floor_area_m2),
                cell(row.intensity_kwh_per_m2),
            ]);
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| BembatchError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出批次结果为 JSON
pub fn result_to_json(result: &BatchResult, output_path: &Path) -> Result<()> {
    let file = File::create(output_path).map_err(|e| BembatchError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush().map_err(|e| BembatchError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// JSON 文件位置：CSV 旁边的同名 `.json`，否则当前目录的 `results.json`
pub fn json_path_for(csv_path: Option<&Path>) -> PathBuf {
    match csv_path {
        Some(path) => path.with_extension("json"),
        None => PathBuf::from("results.json"),
    }
}
