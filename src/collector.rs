//! Match collector (C12): walks the store producing export rows with a
//! stable `global_index`, so narrowing a scan never shifts the printed
//! index of a match that survives.

use crate::{
    classifier::{
        RegionClassifier,
        RegionFilter,
    },
    scan_type::ScanDataType,
    store::MatchStore,
};

#[derive(Clone, Debug)]
pub struct MatchEntry {
    pub index: usize,
    pub address: u64,
    pub value: Vec<u8>,
    pub region: String,
}

/// Walks `store` in swath/cell order, incrementing `global_index` on every
/// matched cell (even ones filtered out at export time), and materializes
/// up to `limit` rows.
///
/// Returns `(entries, effective_total)`: `effective_total` is the
/// export-filtered match count when `region_filter` actually restricts
/// anything, else the raw match count.
pub fn collect(
    store: &MatchStore,
    classifier: Option<&RegionClassifier>,
    region_filter: Option<&RegionFilter>,
    last_scan_data_type: Option<ScanDataType>,
    limit: usize,
) -> (Vec<MatchEntry>, usize) {
    let value_size = last_scan_data_type.map(ScanDataType::bytes_needed).unwrap_or(1);

    let mut entries = Vec::new();
    let mut global_index = 0usize;
    let mut effective_total = 0usize;

    for swath in store.swaths() {
        for i in 0..swath.cells.len() {
            if !swath.cells[i].is_match() {
                continue;
            }

            let address = swath.address_of(i);

            let allowed = match (region_filter, classifier) {
                (Some(filter), Some(classifier)) => filter.is_address_allowed(address as usize, classifier),
                _ => true,
            };

            if !allowed {
                global_index += 1;
                continue;
            }

            effective_total += 1;

            if entries.len() < limit {
                let end = (i + value_size).min(swath.cells.len());
                let value = swath.cells[i..end].iter().map(|c| c.old_byte).collect();
                let region = classifier.map(|c| c.classify(address as usize)).unwrap_or_else(|| "unk".to_string());

                entries.push(MatchEntry {
                    index: global_index,
                    address,
                    value,
                    region,
                });
            }

            global_index += 1;
        }
    }

    (entries, effective_total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        flags::MatchFlags,
        store::{
            Swath,
            SwathCell,
        },
    };

    fn matched_cell(byte: u8) -> SwathCell {
        let mut cell = SwathCell::new(byte);
        cell.match_info = MatchFlags::U8;
        cell
    }

    #[test]
    fn global_index_is_stable_across_export_filtering() {
        let mut swath = Swath::new(0x1000);
        swath.cells = vec![matched_cell(1), SwathCell::new(0), matched_cell(2), matched_cell(3)];

        let mut store = MatchStore::new();
        store.push_swath(swath);

        let (entries, total) = collect(&store, None, None, Some(ScanDataType::I8), 10);
        assert_eq!(total, 3);
        assert_eq!(entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn limit_truncates_entries_but_not_effective_total() {
        let mut swath = Swath::new(0x2000);
        swath.cells = vec![matched_cell(1), matched_cell(2), matched_cell(3)];

        let mut store = MatchStore::new();
        store.push_swath(swath);

        let (entries, total) = collect(&store, None, None, Some(ScanDataType::I8), 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(total, 3);
    }
}
