//! The match store (C8): swaths of contiguous remote bytes carrying a
//! per-byte old value and match flags, plus the bounded history ring that
//! remembers past scans.

use std::collections::VecDeque;

use crate::{
    config::ScanOptions,
    flags::MatchFlags,
    scan_type::ScanDataType,
    value::UserValue,
};

/// A history ring deeper than this drops its oldest entry on push.
pub const HISTORY_DEPTH: usize = 10;

/// One byte of a [`Swath`]: the value last read there, and whether it is
/// currently considered a match (and for which widths/types).
#[derive(Clone, Copy, Debug, Default)]
pub struct SwathCell {
    pub old_byte: u8,
    pub match_info: MatchFlags,
}

impl SwathCell {
    pub fn new(old_byte: u8) -> Self {
        SwathCell {
            old_byte,
            match_info: MatchFlags::empty(),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.match_info.is_empty()
    }

    pub fn clear(&mut self) {
        self.match_info = MatchFlags::empty();
    }
}

/// A contiguous run of remote-address bytes captured at one point in time.
/// `cells[i]` always describes the byte at `first_byte_in_child + i`; cells
/// are appended in ascending remote-address order.
#[derive(Clone, Debug, Default)]
pub struct Swath {
    pub first_byte_in_child: u64,
    pub cells: Vec<SwathCell>,
}

impl Swath {
    pub fn new(first_byte_in_child: u64) -> Self {
        Swath {
            first_byte_in_child,
            cells: Vec::new(),
        }
    }

    pub fn end(&self) -> u64 {
        self.first_byte_in_child + self.cells.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn has_any_match(&self) -> bool {
        self.cells.iter().any(SwathCell::is_match)
    }

    pub fn address_of(
        &self,
        index: usize,
    ) -> u64 {
        self.first_byte_in_child + index as u64
    }

    /// Drops cells whose remote address falls inside `[start, end)`,
    /// splitting this swath into up to two if the range falls in its
    /// interior.
    pub fn delete_in_address_range(
        &mut self,
        start: u64,
        end: u64,
    ) -> Option<Swath> {
        if end <= self.first_byte_in_child || start >= self.end() {
            return None;
        }

        let local_start = start.saturating_sub(self.first_byte_in_child) as usize;
        let local_end = (end.saturating_sub(self.first_byte_in_child) as usize).min(self.cells.len());

        if local_end >= self.cells.len() {
            self.cells.truncate(local_start);
            return None;
        }

        let tail_cells = self.cells.split_off(local_end);
        let tail = Swath {
            first_byte_in_child: self.first_byte_in_child + local_end as u64,
            cells: tail_cells,
        };
        self.cells.truncate(local_start);
        Some(tail)
    }
}

/// Owns every swath produced by a scan. Swaths never overlap in remote
/// address space and are kept in insertion order (which corresponds to the
/// region order the engine produced them in).
#[derive(Clone, Debug, Default)]
pub struct MatchStore {
    swaths: Vec<Swath>,
}

impl MatchStore {
    pub fn new() -> Self {
        MatchStore::default()
    }

    pub fn push_swath(
        &mut self,
        swath: Swath,
    ) {
        if !swath.is_empty() {
            self.swaths.push(swath);
        }
    }

    pub fn swaths(&self) -> &[Swath] {
        &self.swaths
    }

    pub fn swaths_mut(&mut self) -> &mut Vec<Swath> {
        &mut self.swaths
    }

    pub fn is_empty(&self) -> bool {
        self.swaths.iter().all(|s| s.is_empty())
    }

    pub fn has_any_match(&self) -> bool {
        self.swaths.iter().any(Swath::has_any_match)
    }

    pub fn match_count(&self) -> usize {
        self.swaths.iter().map(|s| s.cells.iter().filter(|c| c.is_match()).count()).sum()
    }

    /// Drops every swath left empty after in-place mutation (e.g. by the
    /// filter engine clearing cells).
    pub fn prune_empty(&mut self) {
        self.swaths.retain(|s| !s.is_empty());
    }

    /// Deletes every cell whose remote address falls in `[start, end)` and
    /// returns how many of the deleted cells were matches.
    pub fn delete_in_address_range(
        &mut self,
        start: u64,
        end: u64,
    ) -> usize {
        let mut deleted_matches = 0usize;
        let mut extra = Vec::new();
        for swath in self.swaths.iter_mut() {
            let local_start = (start.saturating_sub(swath.first_byte_in_child) as usize).min(swath.cells.len());
            let local_end = (end.saturating_sub(swath.first_byte_in_child) as usize).min(swath.cells.len());
            if local_end > local_start {
                deleted_matches += swath.cells[local_start..local_end].iter().filter(|c| c.is_match()).count();
            }

            if let Some(tail) = swath.delete_in_address_range(start, end) {
                extra.push(tail);
            }
        }
        self.swaths.extend(extra);
        self.prune_empty();
        deleted_matches
    }

    pub fn reset(&mut self) {
        self.swaths.clear();
    }

    /// Reconstructs an [`crate::value::OldValue`] for `addr` out of a prior
    /// snapshot's recorded bytes, if that snapshot covers at least `width`
    /// contiguous bytes starting there.
    pub fn old_value_at(
        &self,
        addr: u64,
        width: usize,
    ) -> Option<crate::value::OldValue> {
        for swath in &self.swaths {
            if addr < swath.first_byte_in_child || addr + width as u64 > swath.end() {
                continue;
            }
            let start = (addr - swath.first_byte_in_child) as usize;
            let bytes: Vec<u8> = swath.cells[start..start + width].iter().map(|c| c.old_byte).collect();
            return Some(crate::value::OldValue::new(bytes));
        }
        None
    }
}

/// Cumulative counters for one scan invocation. Merged additively across
/// parallel workers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanStats {
    pub regions_visited: usize,
    pub bytes_scanned: u64,
    pub matches: usize,
}

impl ScanStats {
    pub fn merge(
        &mut self,
        other: &ScanStats,
    ) {
        self.regions_visited += other.regions_visited;
        self.bytes_scanned += other.bytes_scanned;
        self.matches += other.matches;
    }
}

/// One entry of the session's bounded history ring. Never mutated after
/// push; the store snapshot is a deep copy, not shared with the live
/// session store.
#[derive(Clone, Debug)]
pub struct ScanResult {
    pub stats: ScanStats,
    pub options_used: ScanOptions,
    pub user_value: Option<UserValue>,
    pub store_snapshot: MatchStore,
    pub data_type: ScanDataType,
}

/// A fixed-depth, never-reordered ring of past scan results. Pushing past
/// `HISTORY_DEPTH` drops the oldest entry.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: VecDeque<ScanResult>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn push(
        &mut self,
        result: ScanResult,
    ) {
        if self.entries.len() >= HISTORY_DEPTH {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&ScanResult> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanResult> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn swath_of(
        base: u64,
        len: usize,
    ) -> Swath {
        let mut swath = Swath::new(base);
        swath.cells = vec![SwathCell::new(0); len];
        swath
    }

    #[test]
    fn swath_cell_clear_resets_match_info() {
        let mut cell = SwathCell::new(7);
        cell.match_info = MatchFlags::U32;
        assert!(cell.is_match());
        cell.clear();
        assert!(!cell.is_match());
    }

    #[test]
    fn delete_in_address_range_truncates_tail() {
        let mut swath = swath_of(100, 10);
        let tail = swath.delete_in_address_range(105, 200);
        assert!(tail.is_none());
        assert_eq!(swath.cells.len(), 5);
    }

    #[test]
    fn delete_in_address_range_splits_interior() {
        let mut swath = swath_of(100, 10);
        let tail = swath.delete_in_address_range(103, 106).unwrap();
        assert_eq!(swath.cells.len(), 3);
        assert_eq!(tail.first_byte_in_child, 106);
        assert_eq!(tail.cells.len(), 4);
    }

    #[test]
    fn delete_in_address_range_outside_swath_is_noop() {
        let mut swath = swath_of(100, 10);
        let tail = swath.delete_in_address_range(0, 50);
        assert!(tail.is_none());
        assert_eq!(swath.cells.len(), 10);
    }

    #[test]
    fn delete_in_address_range_returns_deleted_match_count() {
        let mut store = MatchStore::new();
        let mut swath = swath_of(100, 10);
        for cell in swath.cells[2..6].iter_mut() {
            cell.match_info = MatchFlags::U8;
        }
        store.push_swath(swath);

        let deleted = store.delete_in_address_range(102, 106);
        assert_eq!(deleted, 4);
        assert_eq!(store.swaths()[0].cells.len(), 6);
    }

    #[test]
    fn match_store_prunes_empty_swaths() {
        let mut store = MatchStore::new();
        store.push_swath(swath_of(0, 4));
        store.swaths_mut()[0].cells.iter_mut().for_each(SwathCell::clear);
        assert!(store.has_any_match() == false);
        store.swaths_mut()[0].cells.clear();
        store.prune_empty();
        assert!(store.is_empty());
    }

    #[test]
    fn history_ring_drops_oldest_past_depth() {
        let mut history = History::new();
        for i in 0..(HISTORY_DEPTH + 3) {
            history.push(ScanResult {
                stats: ScanStats {
                    regions_visited: i,
                    bytes_scanned: 0,
                    matches: 0,
                },
                options_used: ScanOptions::default(),
                user_value: None,
                store_snapshot: MatchStore::new(),
                data_type: ScanDataType::I32,
            });
        }
        assert_eq!(history.len(), HISTORY_DEPTH);
        assert_eq!(history.get(0).unwrap().stats.regions_visited, 3);
    }
}
