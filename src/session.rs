//! Scanner session (C14): the object a host (the out-of-scope CLI, a test
//! harness, anything else) drives a scan through. Owns the pid, the live
//! match store, the region list of the most recent scan, and the bounded
//! history ring.

use crate::{
    classifier::{
        RegionClassifier,
        RegionFilter,
    },
    collector::{
        self,
        MatchEntry,
    },
    config::ScanOptions,
    deps::log::{
        info,
        warn,
    },
    endian::Endianness,
    engine,
    error::Error,
    liveness::{
        self,
        ProcessLiveness,
    },
    procmem::ProcessMemory,
    region::{
        self,
        Region,
    },
    scan_type::ScanDataType,
    store::{
        History,
        MatchStore,
        ScanResult,
    },
    value::UserValue,
    writer,
};

/// Owns one scan target. Mirrors the state machine: `Fresh` (no matches
/// yet) until the first full scan, then `Matched`, narrowed by further
/// filter scans or replaced by another full scan.
pub struct ScannerSession {
    pid: Option<u32>,
    store: MatchStore,
    regions: Vec<Region>,
    history: History,
    last_options: Option<ScanOptions>,
    last_data_type: Option<ScanDataType>,
}

impl ScannerSession {
    pub fn new(pid: Option<u32>) -> Self {
        ScannerSession {
            pid,
            store: MatchStore::new(),
            regions: Vec::new(),
            history: History::new(),
            last_options: None,
            last_data_type: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_target_alive(&self) -> bool {
        let alive = liveness::liveness(self.pid).is_alive();
        if !alive {
            warn!("target pid {:?} does not appear to be running", self.pid);
        }
        alive
    }

    /// Discovers regions, builds a routine, and scans the whole filtered
    /// set, replacing the current match store.
    pub fn full_scan(
        &mut self,
        options: ScanOptions,
        user_value: Option<UserValue>,
    ) -> Result<(), Error> {
        if liveness::liveness(self.pid) == ProcessLiveness::Dead {
            return Err(Error::TargetUnavailable {
                reason: "target process is not running".to_string(),
            });
        }

        let mut regions = region::discover_regions(self.pid, options.region_level.into())?;
        if options.region_filter.is_scan_time_active() {
            let filter = RegionFilter::new(options.region_filter.allowed_types.clone());
            regions = filter.filter_regions(regions);
        }

        let previous_snapshot = if self.store.is_empty() { None } else { Some(&self.store) };
        let (store, stats) = engine::full_scan(self.pid, &regions, &options, user_value.as_ref(), previous_snapshot)?;

        info!("full scan on pid {:?}: {} regions, {} matches", self.pid, regions.len(), stats.matches);

        self.regions = regions;
        self.store = store;
        self.last_data_type = Some(options.data_type);
        self.last_options = Some(options);

        Ok(())
    }

    /// Re-applies a new predicate against only the cells matched so far.
    pub fn filter_scan(
        &mut self,
        options: ScanOptions,
        user_value: Option<UserValue>,
    ) -> Result<(), Error> {
        let stats = engine::filter_scan(self.pid, &mut self.store, &options, user_value.as_ref())?;
        info!("filter scan on pid {:?}: {} matches remain", self.pid, stats.matches);

        self.last_data_type = Some(options.data_type);
        self.last_options = Some(options);

        Ok(())
    }

    fn classifier(&self) -> RegionClassifier {
        RegionClassifier::new(&self.regions)
    }

    /// Lists the first `n` surviving matches, applying `region_filter` at
    /// export time if given.
    pub fn list(
        &self,
        n: usize,
        region_filter: Option<&RegionFilter>,
    ) -> (Vec<MatchEntry>, usize) {
        let classifier = self.classifier();
        collector::collect(&self.store, Some(&classifier), region_filter, self.last_data_type, n)
    }

    fn endianness(&self) -> Endianness {
        self.last_options.as_ref().map(|o| o.endianness()).unwrap_or(Endianness::Native)
    }

    pub fn write_scalar(
        &self,
        addr: u64,
        value_bits: u64,
        width: usize,
    ) -> Result<(), Error> {
        let mem = ProcessMemory::open_read_write(self.pid)?;
        writer::write_scalar(&mem, addr, value_bits, width, self.endianness())
    }

    pub fn write_bytes(
        &self,
        addr: u64,
        buf: &[u8],
    ) -> Result<(), Error> {
        let mem = ProcessMemory::open_read_write(self.pid)?;
        writer::write_bytes(&mem, addr, buf)
    }

    pub fn write_to_matches(
        &self,
        value: &[u8],
    ) -> Result<writer::WriteReport, Error> {
        let mem = ProcessMemory::open_read_write(self.pid)?;
        Ok(writer::write_to_matches_batch(&mem, &self.store, value))
    }

    pub fn write_to_match_targeted(
        &self,
        swath_index: usize,
        cell_index: usize,
        value_bits: u64,
    ) -> Result<(), Error> {
        let mem = ProcessMemory::open_read_write(self.pid)?;
        writer::write_to_match_targeted(&mem, &self.store, swath_index, cell_index, value_bits, self.endianness())
    }

    /// Deep-copies the current store into the history ring.
    pub fn push_history(&mut self) {
        let Some(options) = self.last_options.clone() else { return };
        let Some(data_type) = self.last_data_type else { return };

        self.history.push(ScanResult {
            stats: crate::store::ScanStats {
                regions_visited: self.regions.len(),
                bytes_scanned: 0,
                matches: self.store.match_count(),
            },
            options_used: options,
            user_value: None,
            store_snapshot: self.store.clone(),
            data_type,
        });
        info!("pushed scan result into history, depth now {}", self.history.len());
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Restores the live store from a history entry, without removing it
    /// from the ring.
    pub fn restore(
        &mut self,
        index: usize,
    ) -> Result<(), Error> {
        let entry = self.history.get(index).ok_or_else(|| Error::InvalidOptions {
            reason: format!("no history entry at index {}", index),
        })?;
        self.store = entry.store_snapshot.clone();
        self.last_options = Some(entry.options_used.clone());
        self.last_data_type = Some(entry.data_type);
        Ok(())
    }

    /// Returns to `Fresh`: clears the store and last-scan bookkeeping, but
    /// leaves history intact.
    pub fn reset(&mut self) {
        self.store.reset();
        self.regions.clear();
        self.last_options = None;
        self.last_data_type = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scan_type::ScanMatchType;

    #[test]
    fn new_session_starts_empty() {
        let session = ScannerSession::new(None);
        let (entries, total) = session.list(10, None);
        assert!(entries.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn full_scan_against_self_finds_a_stack_value() {
        let needle: i32 = 0x7abc_1234;
        let _keep_alive = &needle;

        let mut session = ScannerSession::new(None);
        let options = ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::EqualTo,
            region_level: crate::config::RegionLevel::AllRW,
            ..ScanOptions::default()
        };
        let user_value = UserValue::scalar::<i32>(needle);

        session.full_scan(options, Some(user_value)).expect("full scan should succeed against self");
        let (_, total) = session.list(10, None);
        assert!(total >= 1, "expected at least one match for the stack-resident needle");
    }

    #[test]
    fn reset_clears_store_but_keeps_history() {
        let mut session = ScannerSession::new(None);
        session.push_history();
        session.reset();
        assert!(session.list(10, None).0.is_empty());
    }
}
