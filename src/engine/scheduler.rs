//! Parallel scheduler (C11): fans the full-scan engine out across regions
//! using scoped threads over a shared "next region" cursor.

use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

use crate::{
    config::ScanOptions,
    deps::log::info,
    engine::full_scan::scan_region,
    error::Error,
    procmem::ProcessMemory,
    region::Region,
    store::{
        MatchStore,
        ScanStats,
        Swath,
    },
    value::UserValue,
};

/// Runs a full scan across `regions`, parallel across `hardware_parallelism`
/// workers when there is more than one region to justify it, serial
/// otherwise. Output is byte-identical to the serial engine modulo
/// scheduling, because the reduce step re-sorts by `region.id`.
pub fn full_scan(
    pid: Option<u32>,
    regions: &[Region],
    options: &ScanOptions,
    user_value: Option<&UserValue>,
    previous_snapshot: Option<&MatchStore>,
) -> Result<(MatchStore, ScanStats), Error> {
    let worker_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(regions.len().max(1));

    if worker_count <= 1 || regions.len() <= 1 {
        return super::full_scan::full_scan_serial(pid, regions, options, user_value, previous_snapshot);
    }

    let cursor = AtomicUsize::new(0);
    type WorkerOutput = (Vec<(usize, Swath)>, Vec<(usize, ScanStats)>);
    let mut worker_results: Vec<Result<WorkerOutput, Error>> = Vec::with_capacity(worker_count);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let cursor = &cursor;
            let regions = regions;
            let options = options;
            let user_value = user_value.cloned();
            let previous_snapshot = previous_snapshot;

            handles.push(scope.spawn(move || -> Result<WorkerOutput, Error> {
                let mem = ProcessMemory::open_read_only(pid)?;
                let mut local_swaths: Vec<(usize, Swath)> = Vec::new();
                let mut local_stats: Vec<(usize, ScanStats)> = Vec::new();

                loop {
                    let idx = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(region) = regions.get(idx) else { break };

                    let mut scratch = MatchStore::new();
                    let bytes_scanned =
                        scan_region(&mem, region, options, user_value.as_ref(), previous_snapshot, &mut scratch)?;

                    // One stats entry per region, regardless of how many
                    // block-sized swaths scan_region split it into.
                    local_stats.push((
                        region.id,
                        ScanStats {
                            regions_visited: 1,
                            bytes_scanned,
                            matches: 0,
                        },
                    ));

                    for swath in scratch.swaths_mut().drain(..) {
                        local_swaths.push((region.id, swath));
                    }
                }

                Ok((local_swaths, local_stats))
            }));
        }

        for handle in handles {
            worker_results.push(handle.join().unwrap_or_else(|_| {
                Err(Error::TargetUnavailable {
                    reason: "a scan worker thread panicked".to_string(),
                })
            }));
        }
    });

    let mut merged: Vec<(usize, Swath)> = Vec::new();
    let mut region_stats: Vec<(usize, ScanStats)> = Vec::new();
    let mut stats = ScanStats::default();
    let mut seen_swaths = std::collections::HashSet::new();
    let mut seen_regions = std::collections::HashSet::new();

    for result in worker_results {
        let (swaths, stats_entries) = result?;
        merged.extend(swaths);
        region_stats.extend(stats_entries);
    }

    for (region_id, one_region_stats) in region_stats {
        if seen_regions.insert(region_id) {
            stats.merge(&one_region_stats);
        }
    }

    merged.sort_by_key(|(region_id, swath)| (*region_id, swath.first_byte_in_child));

    let mut store = MatchStore::new();
    for (region_id, swath) in merged {
        if !seen_swaths.insert((region_id, swath.first_byte_in_child)) {
            continue;
        }
        store.push_swath(swath);
    }

    stats.matches = store.match_count();
    info!("full scan complete: {} regions visited, {} bytes scanned, {} matches", stats.regions_visited, stats.bytes_scanned, stats.matches);

    Ok((store, stats))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        region::RegionType,
        scan_type::{
            ScanDataType,
            ScanMatchType,
        },
        value::UserValue,
    };

    #[test]
    fn stats_count_each_region_once_regardless_of_swath_count() {
        let needle: i32 = 0x5a5a_5a5a;
        let addr = &needle as *const i32 as usize;

        // A block_size smaller than either region forces scan_region to
        // split each one into several swaths.
        let region_a = Region {
            id: 0,
            start: addr - 64,
            end: addr + 64,
            writable: true,
            region_type: RegionType::Misc,
            load_addr: addr - 64,
            filename: String::new(),
        };
        let region_b = Region {
            id: 1,
            start: addr - 128,
            end: addr - 64,
            writable: true,
            region_type: RegionType::Misc,
            load_addr: addr - 128,
            filename: String::new(),
        };
        let expected_bytes = (region_a.len() + region_b.len()) as u64;

        let options = ScanOptions {
            data_type: ScanDataType::I32,
            match_type: ScanMatchType::EqualTo,
            block_size: 16,
            ..ScanOptions::default()
        };
        let user_value = UserValue::scalar::<i32>(needle);

        let (_, stats) = full_scan(None, &[region_a, region_b], &options, Some(&user_value), None).unwrap();

        assert_eq!(stats.regions_visited, 2);
        assert_eq!(stats.bytes_scanned, expected_bytes);
    }
}
