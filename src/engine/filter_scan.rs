//! Filter (narrowing) engine (C10): re-reads only previously matched
//! positions and re-applies a new predicate, monotonically narrowing (or
//! clearing) the match store.

use crate::{
    config::ScanOptions,
    deps::log::info,
    error::Error,
    flags::MatchFlags,
    procmem::ProcessMemory,
    routines::build_routine,
    store::{
        MatchStore,
        ScanStats,
    },
    value::{
        OldValue,
        UserValue,
    },
};

/// Narrows `store` in place against a new predicate. Fails `NoExistingMatches`
/// if the store has nothing matched to narrow.
pub fn filter_scan(
    pid: Option<u32>,
    store: &mut MatchStore,
    options: &ScanOptions,
    user_value: Option<&UserValue>,
) -> Result<ScanStats, Error> {
    if !store.has_any_match() {
        return Err(Error::NoExistingMatches);
    }

    let routine = build_routine(options.data_type, options.match_type, options.endianness())?;
    let bytes_needed = options.data_type.bytes_needed();
    let mem = ProcessMemory::open_read_only(pid)?;

    let mut stats = ScanStats::default();
    let mut regions_visited = 0usize;

    for swath in store.swaths_mut() {
        if !swath.has_any_match() {
            continue;
        }
        regions_visited += 1;

        let len = swath.cells.len();
        for i in 0..len {
            if !swath.cells[i].is_match() {
                continue;
            }

            let addr = swath.first_byte_in_child + i as u64;
            let mut fresh = vec![0u8; bytes_needed];
            let read = mem.read(addr, &mut fresh)?;
            if read < bytes_needed {
                swath.cells[i].clear();
                continue;
            }

            let old_value = if options.match_type.uses_old_value() {
                if i + bytes_needed > len {
                    swath.cells[i].clear();
                    continue;
                }
                let bytes: Vec<u8> = swath.cells[i..i + bytes_needed].iter().map(|c| c.old_byte).collect();
                Some(OldValue::new(bytes))
            } else {
                None
            };

            let mut out_flags = MatchFlags::empty();
            let matched = routine(&fresh, old_value.as_ref(), user_value, &mut out_flags);

            if matched > 0 {
                swath.cells[i].match_info = out_flags;
                swath.cells[i].old_byte = fresh[0];
                stats.matches += 1;
            } else {
                swath.cells[i].clear();
            }
        }
    }

    store.prune_empty();
    stats.regions_visited = regions_visited;
    info!("filter scan complete: {} cells re-evaluated across {} swaths, {} matches remain", stats.regions_visited, regions_visited, stats.matches);

    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        scan_type::{
            ScanDataType,
            ScanMatchType,
        },
        store::{
            Swath,
            SwathCell,
        },
    };

    #[test]
    fn fails_when_store_has_no_matches() {
        let mut store = MatchStore::new();
        store.push_swath(Swath::new(0));
        let options = ScanOptions::default();
        let err = filter_scan(None, &mut store, &options, None).unwrap_err();
        assert!(matches!(err, Error::NoExistingMatches));
    }

    #[test]
    fn narrows_matched_cells_against_new_predicate() {
        let needle: i32 = 0x1111_2222;
        let addr = &needle as *const i32 as u64;

        let mut swath = Swath::new(addr);
        swath.cells = vec![SwathCell::new(0); 4];
        // Only the start cell of a 4-byte match carries match_info.
        swath.cells[0].match_info = MatchFlags::S32;

        let mut store = MatchStore::new();
        store.push_swath(swath);

        let options = ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::EqualTo,
            ..ScanOptions::default()
        };
        let user_value = UserValue::scalar::<i32>(needle);

        let stats = filter_scan(None, &mut store, &options, Some(&user_value)).unwrap();
        assert_eq!(stats.matches, 1);
        assert!(store.has_any_match());
    }
}
