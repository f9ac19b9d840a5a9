//! # 结果归约器
//!
//! 把一次运行的逐时间步、逐分区记录归约为固定的汇总指标。
//!
//! ## 计算
//! - 超温小时数 = 室内空气温度严格高于阈值的步数 × 步长 (h)
//! - 能耗 (kWh) = Σ 平均功率 (W) × 步长 (h) / 1000
//! - 供暖 = 1a + 1b，制冷 = 3a + 3b，电力专用 = 4a + 4b + 5 + 6
//!
//! 类别标签由引擎定义。无法识别的标签按零计入而不是报错，
//! 这样引擎新增类别时旧版本仍能工作。
//!
//! 归约是纯函数：不修改输入，对同一输入重复归约得到逐位相同的结果。
//!
//! ## 依赖关系
//! - 被 `batch/scheduler.rs` 和 `commands/analyze.rs` 调用
//! - 使用 `models/run.rs`, `models/summary.rs`

use crate::models::{RawRunOutput, SummaryRow};

/// 引擎的时间步长 (h)
pub const STEP_HOURS: f64 = 0.25;

/// 紧凑模式的超温阈值 (°C)
pub const OVERHEAT_THRESHOLD_C: f64 = 26.0;

/// 能耗类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemandCategory {
    SpaceHeating,
    VentilationHeating,
    DomesticHotWater,
    SpaceCooling,
    VentilationCooling,
    Fans,
    Pumps,
    Lighting,
    TechnicalEquipment,
}

impl DemandCategory {
    pub const ALL: [DemandCategory; 9] = [
        DemandCategory::SpaceHeating,
        DemandCategory::VentilationHeating,
        DemandCategory::DomesticHotWater,
        DemandCategory::SpaceCooling,
        DemandCategory::VentilationCooling,
        DemandCategory::Fans,
        DemandCategory::Pumps,
        DemandCategory::Lighting,
        DemandCategory::TechnicalEquipment,
    ];

    /// 引擎使用的标签
    pub fn label(self) -> &'static str {
        match self {
            DemandCategory::SpaceHeating => "1a Romoppvarming",
            DemandCategory::VentilationHeating => "1b Ventilasjonsvarme",
            DemandCategory::DomesticHotWater => "2 Varmtvann",
            DemandCategory::SpaceCooling => "3a Romkjøling",
            DemandCategory::VentilationCooling => "3b Ventilasjonskjøling",
            DemandCategory::Fans => "4a Vifter",
            DemandCategory::Pumps => "4b Pumper",
            DemandCategory::Lighting => "5 Belysning",
            DemandCategory::TechnicalEquipment => "6 Teknisk utstyr",
        }
    }

    /// 从标签识别类别；未知标签返回 None（按零计入）
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn is_heating(self) -> bool {
        matches!(
            self,
            DemandCategory::SpaceHeating | DemandCategory::VentilationHeating
        )
    }

    pub fn is_cooling(self) -> bool {
        matches!(
            self,
            DemandCategory::SpaceCooling | DemandCategory::VentilationCooling
        )
    }

    pub fn is_electric_specific(self) -> bool {
        matches!(
            self,
            DemandCategory::Fans
                | DemandCategory::Pumps
                | DemandCategory::Lighting
                | DemandCategory::TechnicalEquipment
        )
    }
}

/// 归约参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionProfile {
    /// 超温阈值 (°C)
    pub threshold_c: f64,
    /// 时间步长 (h)
    pub step_hours: f64,
    /// 是否输出热水、电力专用、合计、面积与单位面积能耗
    pub detailed: bool,
}

impl Default for ReductionProfile {
    fn default() -> Self {
        ReductionProfile {
            threshold_c: OVERHEAT_THRESHOLD_C,
            step_hours: STEP_HOURS,
            detailed: false,
        }
    }
}

impl ReductionProfile {
    pub fn detailed() -> Self {
        ReductionProfile {
            detailed: true,
            ..Self::default()
        }
    }

    /// 平均功率之和 (W) → 能量 (kWh)
    fn to_kwh(&self, watts: f64) -> f64 {
        watts * self.step_hours / 1000.0
    }
}

/// 按类别累计的功率和 (W)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals([f64; 9]);

impl CategoryTotals {
    pub fn get(&self, category: DemandCategory) -> f64 {
        self.0[category.index()]
    }

    fn add(&mut self, category: DemandCategory, watts: f64) {
        self.0[category.index()] += watts;
    }

    fn sum_where(&self, pred: impl Fn(DemandCategory) -> bool) -> f64 {
        DemandCategory::ALL
            .into_iter()
            .filter(|c| pred(*c))
            .map(|c| self.get(c))
            .sum()
    }
}

/// 逐步累计：超温步数和各类别功率和
pub fn accumulate(raw: &RawRunOutput, threshold_c: f64) -> (u64, CategoryTotals) {
    let mut over = 0u64;
    let mut totals = CategoryTotals::default();

    for step in raw.steps() {
        if step.air_temperature() > threshold_c {
            over += 1;
        }
        for (label, watts) in &step.power_demand {
            if let Some(category) = DemandCategory::from_label(label) {
                totals.add(category, *watts);
            }
        }
    }

    (over, totals)
}

/// 归约一次运行
pub fn reduce(climate_name: &str, raw: &RawRunOutput, profile: &ReductionProfile) -> SummaryRow {
    let (over, totals) = accumulate(raw, profile.threshold_c);

    let mut row = SummaryRow {
        climate_name: climate_name.to_string(),
        hours_above_threshold: over as f64 * profile.step_hours,
        heating_kwh: profile.to_kwh(totals.sum_where(DemandCategory::is_heating)),
        cooling_kwh: profile.to_kwh(totals.sum_where(DemandCategory::is_cooling)),
        hot_water_kwh: None,
        electric_specific_kwh: None,
        total_kwh: None,
        floor_area_m2: None,
        intensity_kwh_per_m2: None,
    };

    if profile.detailed {
        let total = profile.to_kwh(totals.sum_where(|_| true));
        let area: f64 = raw.zone_metadata.iter().map(|z| z.area).sum();

        row.hot_water_kwh =
            Some(profile.to_kwh(totals.get(DemandCategory::DomesticHotWater)));
        row.electric_specific_kwh =
            Some(profile.to_kwh(totals.sum_where(DemandCategory::is_electric_specific)));
        row.total_kwh = Some(total);
        row.floor_area_m2 = Some(area);
        row.intensity_kwh_per_m2 = if area > 0.0 { Some(total / area) } else { None };
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepRecord, ZoneMetadata};

    fn zone(steps: Vec<StepRecord>) -> RawRunOutput {
        let mut raw = RawRunOutput::default();
        raw.steps_per_zone.insert("Sone 1".to_string(), steps);
        raw
    }

    #[test]
    fn test_heating_energy_scenario() {
        let steps = [30.0, 40.0, 20.0, 0.0]
            .iter()
            .map(|w| StepRecord::new(20.0).with_power("1a Romoppvarming", *w))
            .collect();
        let row = reduce("Oslo", &zone(steps), &ReductionProfile::default());
        assert!((row.heating_kwh - 0.0225).abs() < 1e-12);
        assert_eq!(row.cooling_kwh, 0.0);
    }

    #[test]
    fn test_overheating_hours_scenario() {
        let steps = [25.0, 27.0, 26.5, 24.0]
            .iter()
            .map(|t| StepRecord::new(*t))
            .collect();
        let raw = zone(steps);
        let (over, _) = accumulate(&raw, 26.0);
        assert_eq!(over, 2);
        let row = reduce("Oslo", &raw, &ReductionProfile::default());
        assert_eq!(row.hours_above_threshold, 0.5);
    }

    #[test]
    fn test_threshold_is_strict() {
        let raw = zone(vec![StepRecord::new(26.0), StepRecord::new(26.01)]);
        assert_eq!(accumulate(&raw, 26.0).0, 1);
    }

    #[test]
    fn test_category_grouping_and_unknown_labels() {
        let step = StepRecord::new(21.0)
            .with_power("1a Romoppvarming", 1000.0)
            .with_power("1b Ventilasjonsvarme", 1000.0)
            .with_power("3a Romkjøling", 400.0)
            .with_power("3b Ventilasjonskjøling", 400.0)
            .with_power("4a Vifter", 100.0)
            .with_power("5 Belysning", 100.0)
            .with_power("2 Varmtvann", 200.0)
            .with_power("7 Ny post", 99999.0);
        let mut raw = zone(vec![step]);
        raw.zone_metadata = vec![ZoneMetadata { area: 50.0 }, ZoneMetadata { area: 50.0 }];

        let row = reduce("Bergen", &raw, &ReductionProfile::detailed());
        assert!((row.heating_kwh - 0.5).abs() < 1e-12);
        assert!((row.cooling_kwh - 0.2).abs() < 1e-12);
        assert!((row.hot_water_kwh.unwrap() - 0.05).abs() < 1e-12);
        assert!((row.electric_specific_kwh.unwrap() - 0.05).abs() < 1e-12);
        // 未知标签不计入合计
        assert!((row.total_kwh.unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(row.floor_area_m2, Some(100.0));
        assert!((row.intensity_kwh_per_m2.unwrap() - 0.008).abs() < 1e-12);
    }

    #[test]
    fn test_compact_profile_omits_detail() {
        let row = reduce("Oslo", &zone(vec![]), &ReductionProfile::default());
        assert!(!row.is_detailed());
        assert_eq!(row.floor_area_m2, None);
        assert_eq!(row.hours_above_threshold, 0.0);
    }

    #[test]
    fn test_zero_area_has_no_intensity() {
        let raw = zone(vec![StepRecord::new(20.0).with_power("2 Varmtvann", 10.0)]);
        let row = reduce("Oslo", &raw, &ReductionProfile::detailed());
        assert_eq!(row.floor_area_m2, Some(0.0));
        assert_eq!(row.intensity_kwh_per_m2, None);
    }

    #[test]
    fn test_reduce_is_idempotent_and_pure() {
        let mut raw = zone(vec![
            StepRecord::new(27.3).with_power("1a Romoppvarming", 0.1),
            StepRecord::new(19.9).with_power("3a Romkjøling", 0.7),
        ]);
        raw.steps_per_zone.insert(
            "Sone 2".to_string(),
            vec![StepRecord::new(30.0).with_power("6 Teknisk utstyr", 0.3)],
        );
        let before = raw.clone();

        let a = reduce("Oslo", &raw, &ReductionProfile::detailed());
        let b = reduce("Oslo", &raw, &ReductionProfile::detailed());
        assert_eq!(a.heating_kwh.to_bits(), b.heating_kwh.to_bits());
        assert_eq!(a.cooling_kwh.to_bits(), b.cooling_kwh.to_bits());
        assert_eq!(
            a.total_kwh.unwrap().to_bits(),
            b.total_kwh.unwrap().to_bits()
        );
        assert_eq!(a, b);
        assert_eq!(raw, before);
    }

    #[test]
    fn test_non_negative_power_gives_non_negative_energy() {
        let steps: Vec<StepRecord> = (0..200)
            .map(|i| {
                let w = (i % 7) as f64 * 13.5;
                StepRecord::new(20.0 + (i % 10) as f64)
                    .with_power("1a Romoppvarming", w)
                    .with_power("3b Ventilasjonskjøling", w / 2.0)
                    .with_power("4b Pumper", w / 3.0)
            })
            .collect();
        let row = reduce("Oslo", &zone(steps), &ReductionProfile::detailed());
        assert!(row.heating_kwh >= 0.0);
        assert!(row.cooling_kwh >= 0.0);
        assert!(row.electric_specific_kwh.unwrap() >= 0.0);
        assert!(row.total_kwh.unwrap() >= row.heating_kwh);
    }

    #[test]
    fn test_label_round_trip() {
        for category in DemandCategory::ALL {
            assert_eq!(DemandCategory::from_label(category.label()), Some(category));
        }
        assert_eq!(DemandCategory::from_label("1a romoppvarming"), None);
    }
}
