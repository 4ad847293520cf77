//! Full-scan engine (C9): streams every readable byte of a target's
//! filtered region set through a routine, recording matches into swaths.

use crate::{
    config::ScanOptions,
    deps::log::debug,
    error::Error,
    procmem::ProcessMemory,
    region::Region,
    routines::build_routine,
    scan_type::ScanDataType,
    store::{
        MatchStore,
        ScanStats,
        Swath,
        SwathCell,
    },
    value::UserValue,
};

/// Scans one region, appending matched swaths to `store` and returning the
/// bytes read for stats purposes. `previous_snapshot` supplies old values
/// for predicates that need them on a full (non-filter) scan, e.g.
/// `Changed` relative to the last recorded sample.
pub fn scan_region(
    mem: &ProcessMemory,
    region: &Region,
    options: &ScanOptions,
    user_value: Option<&UserValue>,
    previous_snapshot: Option<&MatchStore>,
    store: &mut MatchStore,
) -> Result<u64, Error> {
    let routine = build_routine(options.data_type, options.match_type, options.endianness())?;
    let bytes_needed = options.data_type.bytes_needed();
    let step = options.step();
    let block_size = options.block_size.max(bytes_needed);

    let mut bytes_scanned = 0u64;
    let mut addr = region.start as u64;
    let region_end = region.end as u64;

    let mut buf = vec![0u8; block_size];

    while addr < region_end {
        let want = block_size.min((region_end - addr) as usize);
        let read = mem.read(addr, &mut buf[..want])?;
        if read == 0 {
            break;
        }

        let mut swath = Swath::new(addr);
        swath.cells = buf[..read].iter().map(|&b| SwathCell::new(b)).collect();

        let mut off = 0usize;
        while off < read {
            let remaining = &buf[off..read];
            if remaining.len() < bytes_needed {
                break;
            }

            let old_value = if options.match_type.uses_old_value() {
                previous_snapshot.and_then(|snap| snap.old_value_at(addr + off as u64, bytes_needed))
            } else {
                None
            };

            let mut out_flags = crate::flags::MatchFlags::empty();
            let matched = routine(remaining, old_value.as_ref(), user_value, &mut out_flags);
            if matched > 0 {
                // Only the start cell records the match; its flags already carry
                // the width, so filter/collect/write walk one cell per match
                // instead of `matched` cells.
                swath.cells[off].match_info |= out_flags;
            }

            off += step;
        }

        debug!("region {}: read {} bytes at {:#x}", region.id, read, addr);
        bytes_scanned += read as u64;
        store.push_swath(swath);

        addr += read as u64;
        if read < want {
            break;
        }
    }

    Ok(bytes_scanned)
}

/// Runs a full scan serially across every region in `regions`, using one
/// `/proc/<pid>/mem` handle for the whole scan.
pub fn full_scan_serial(
    pid: Option<u32>,
    regions: &[Region],
    options: &ScanOptions,
    user_value: Option<&UserValue>,
    previous_snapshot: Option<&MatchStore>,
) -> Result<(MatchStore, ScanStats), Error> {
    let mem = ProcessMemory::open_read_only(pid)?;
    let mut store = MatchStore::new();
    let mut stats = ScanStats::default();

    for region in regions {
        let scanned = scan_region(&mem, region, options, user_value, previous_snapshot, &mut store)?;
        stats.regions_visited += 1;
        stats.bytes_scanned += scanned;
    }

    stats.matches = store.match_count();
    Ok((store, stats))
}

#[allow(dead_code)]
pub(crate) fn bytes_needed_for(data_type: ScanDataType) -> usize {
    data_type.bytes_needed()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        region::RegionType,
        scan_type::ScanMatchType,
    };

    #[test]
    fn scans_own_stack_variable_with_equal_to() {
        let needle: i32 = 0x4242_4242;
        let addr = &needle as *const i32 as usize;

        let region = Region {
            id: 0,
            start: addr - 16,
            end: addr + 16,
            writable: true,
            region_type: RegionType::Misc,
            load_addr: addr - 16,
            filename: String::new(),
        };

        let options = ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::EqualTo,
            ..ScanOptions::default()
        };
        let user_value = UserValue::scalar::<i32>(needle);

        let mem = ProcessMemory::open_read_only(None).unwrap();
        let mut store = MatchStore::new();
        scan_region(&mem, &region, &options, Some(&user_value), None, &mut store).unwrap();

        assert!(store.has_any_match());
    }

    #[test]
    fn a_multi_byte_match_marks_only_its_start_cell() {
        let needle: i32 = 0x1357_9bdf;
        let addr = &needle as *const i32 as usize;

        let region = Region {
            id: 0,
            start: addr,
            end: addr + 4,
            writable: true,
            region_type: RegionType::Misc,
            load_addr: addr,
            filename: String::new(),
        };

        let options = ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::EqualTo,
            ..ScanOptions::default()
        };
        let user_value = UserValue::scalar::<i32>(needle);

        let mem = ProcessMemory::open_read_only(None).unwrap();
        let mut store = MatchStore::new();
        scan_region(&mem, &region, &options, Some(&user_value), None, &mut store).unwrap();

        assert_eq!(store.match_count(), 1, "a 4-byte match should count as one match, not four");
        let swath = &store.swaths()[0];
        assert!(swath.cells[0].is_match());
        assert!(!swath.cells[1].is_match());
        assert!(!swath.cells[2].is_match());
        assert!(!swath.cells[3].is_match());
    }
}
