//! # EPW 气候文件头部解析
//!
//! 只解析第一行 LOCATION 头部，用于为气候数据集命名。
//!
//! ## LOCATION 格式
//! ```text
//! LOCATION,city,state_province,country,source,WMO,lat,lon,tz,elevation
//! ```
//!
//! ## 依赖关系
//! - 被 `batch/loader.rs` 使用

use std::path::Path;

/// EPW LOCATION 头部
#[derive(Debug, Clone, PartialEq)]
pub struct EpwLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub wmo: String,
}

/// 在文本中查找 LOCATION 行并解析
pub fn parse_location(content: &str) -> Option<EpwLocation> {
    let line = content.lines().find(|l| l.starts_with("LOCATION,"))?;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let field = |i: usize| fields.get(i).map(|s| s.to_string()).unwrap_or_default();
    let city = field(1);
    if city.is_empty() {
        return None;
    }

    Some(EpwLocation {
        city,
        region: field(2),
        country: field(3),
        wmo: field(5),
    })
}

/// 气候显示名称：LOCATION 城市字段，缺失时退回文件名（不含扩展名）
pub fn climate_name(content: &str, path: &Path) -> String {
    parse_location(content)
        .map(|loc| loc.city)
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSLO_HEADER: &str = "LOCATION,Oslo Blindern,-,NOR,IWEC Data,014920,59.95,10.72,1.0,94.0\n\
DESIGN CONDITIONS,0\n";

    #[test]
    fn test_parse_location() {
        let loc = parse_location(OSLO_HEADER).unwrap();
        assert_eq!(loc.city, "Oslo Blindern");
        assert_eq!(loc.country, "NOR");
        assert_eq!(loc.wmo, "014920");
    }

    #[test]
    fn test_climate_name_prefers_location() {
        let name = climate_name(OSLO_HEADER, Path::new("climates/NOR_Oslo.epw"));
        assert_eq!(name, "Oslo Blindern");
    }

    #[test]
    fn test_climate_name_falls_back_to_stem() {
        assert_eq!(
            climate_name("garbage\n1,2,3\n", Path::new("climates/NOR_Bergen.epw")),
            "NOR_Bergen"
        );
        // 空城市字段
        assert_eq!(
            climate_name("LOCATION, ,-,NOR\n", Path::new("Tromso.epw")),
            "Tromso"
        );
    }
}
