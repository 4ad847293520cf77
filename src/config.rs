//! Configuration (C16): the `serde`-(de)serializable surface a host builds
//! and persists scan configurations through, independent of any particular
//! CLI or config-file format.

use crate::{
    deps::serde,
    region::RegionType,
    scan_type::{
        ScanDataType,
        ScanMatchType,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RegionLevel {
    All,
    AllRW,
    HeapStackExecutable,
    HeapStackExecutableBss,
}

impl Default for RegionLevel {
    fn default() -> Self {
        RegionLevel::HeapStackExecutableBss
    }
}

impl From<RegionLevel> for crate::region::ScanLevel {
    fn from(level: RegionLevel) -> Self {
        match level {
            RegionLevel::All => crate::region::ScanLevel::All,
            RegionLevel::AllRW => crate::region::ScanLevel::AllRW,
            RegionLevel::HeapStackExecutable => crate::region::ScanLevel::HeapStackExecutable,
            RegionLevel::HeapStackExecutableBss => crate::region::ScanLevel::HeapStackExecutableBss,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RegionFilterMode {
    Disabled,
    ScanTime,
    ExportTime,
}

impl Default for RegionFilterMode {
    fn default() -> Self {
        RegionFilterMode::Disabled
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RegionFilterConfig {
    pub mode: RegionFilterMode,
    pub allowed_types: Vec<RegionType>,
}

impl RegionFilterConfig {
    pub fn disabled() -> Self {
        RegionFilterConfig::default()
    }

    pub fn is_scan_time_active(&self) -> bool {
        self.mode == RegionFilterMode::ScanTime
    }

    pub fn is_export_time_active(&self) -> bool {
        self.mode == RegionFilterMode::ExportTime
    }
}

/// The caller-provided configuration for one scan (full or filter). Derives
/// `serde::Serialize`/`Deserialize` so a host can load or persist it
/// without any bespoke parsing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScanOptions {
    pub data_type: ScanDataType,
    pub match_type: ScanMatchType,
    pub reverse_endianness: bool,
    pub step: usize,
    pub block_size: usize,
    pub region_level: RegionLevel,
    pub region_filter: RegionFilterConfig,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::Any,
            reverse_endianness: false,
            step: 1,
            block_size: 65536,
            region_level: RegionLevel::default(),
            region_filter: RegionFilterConfig::default(),
        }
    }
}

impl ScanOptions {
    pub fn step(&self) -> usize {
        self.step.max(1)
    }

    pub fn endianness(&self) -> crate::endian::Endianness {
        crate::endian::Endianness::from_reverse_flag(self.reverse_endianness)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_options_are_sensible() {
        let options = ScanOptions::default();
        assert_eq!(options.step(), 1);
        assert_eq!(options.block_size, 65536);
        assert_eq!(options.region_level, RegionLevel::HeapStackExecutableBss);
        assert!(!options.region_filter.is_scan_time_active());
    }

    #[test]
    fn step_floors_at_one() {
        let mut options = ScanOptions::default();
        options.step = 0;
        assert_eq!(options.step(), 1);
    }

    #[test]
    fn region_filter_mode_predicates() {
        let mut cfg = RegionFilterConfig::disabled();
        assert!(!cfg.is_scan_time_active());
        cfg.mode = RegionFilterMode::ExportTime;
        assert!(cfg.is_export_time_active());
    }
}
