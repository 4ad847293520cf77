//! Remote writer (C13): scalar, byte-buffer, and batch/targeted
//! write-to-matches paths against a target's memory.

use crate::{
    deps::log::warn,
    endian::Endianness,
    error::Error,
    procmem::ProcessMemory,
    store::MatchStore,
};

#[derive(Clone, Debug, Default)]
pub struct WriteReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

impl WriteReport {
    fn record(
        &mut self,
        result: Result<(), Error>,
    ) {
        match result {
            Ok(()) => self.success_count += 1,
            Err(err) => {
                self.failed_count += 1;
                self.errors.push(err.to_string());
            }
        }
    }
}

/// Writes `width` bytes of `value_bits` (already laid out little-endian in
/// the caller's integer) into the target's endianness, at `addr`.
pub fn write_scalar(
    mem: &ProcessMemory,
    addr: u64,
    value_bits: u64,
    width: usize,
    endianness: Endianness,
) -> Result<(), Error> {
    if ![1usize, 2, 4, 8].contains(&width) {
        return Err(Error::InvalidOptions {
            reason: format!("write_scalar width must be one of 1, 2, 4, 8, got {}", width),
        });
    }

    match width {
        1 => mem.write(addr, &crate::endian::write_u8(value_bits as u8, endianness)),
        2 => mem.write(addr, &crate::endian::write_u16(value_bits as u16, endianness)),
        4 => mem.write(addr, &crate::endian::write_u32(value_bits as u32, endianness)),
        8 => mem.write(addr, &crate::endian::write_u64(value_bits, endianness)),
        _ => unreachable!("width already validated above"),
    }
}

pub fn write_bytes(
    mem: &ProcessMemory,
    addr: u64,
    buf: &[u8],
) -> Result<(), Error> {
    mem.write(addr, buf)
}

/// Writes `value` once per contiguous matched segment in `store` (batch
/// mode), sized to that segment's `flags.highest_width()` — the same
/// segment-detection `write_to_match_targeted` uses, so a multi-byte match
/// (which owns several consecutive matched cells) is written once instead of
/// once per cell.
pub fn write_to_matches_batch(
    mem: &ProcessMemory,
    store: &MatchStore,
    value: &[u8],
) -> WriteReport {
    let mut report = WriteReport::default();

    for swath in store.swaths() {
        let len = swath.cells.len();
        let mut i = 0;
        while i < len {
            if !swath.cells[i].is_match() {
                i += 1;
                continue;
            }

            let flags = swath.cells[i].match_info;
            let mut end = i + 1;
            while end < len && swath.cells[end].match_info.contains(flags) {
                end += 1;
            }

            let width = flags.highest_width();
            let addr = swath.address_of(i);
            let write_len = width.min(value.len());
            let result = mem.write(addr, &value[..write_len]);
            if result.is_err() {
                warn!("write to match at {:#x} failed", addr);
            }
            report.record(result);

            i = end.max(i + width);
        }
    }

    report
}

/// Writes `value` at a single selected match (by its position within the
/// containing swath), sized to the widest matched flag covering it. Walks
/// backwards from `cell_index` while the predecessor's `match_info` still
/// contains the selected cell's flags, to find the start of the contiguous
/// matched segment.
pub fn write_to_match_targeted(
    mem: &ProcessMemory,
    store: &MatchStore,
    swath_index: usize,
    cell_index: usize,
    value_bits: u64,
    endianness: Endianness,
) -> Result<(), Error> {
    let swath = store.swaths().get(swath_index).ok_or_else(|| Error::InvalidOptions {
        reason: format!("no swath at index {}", swath_index),
    })?;
    let cell = swath.cells.get(cell_index).ok_or_else(|| Error::InvalidOptions {
        reason: format!("no cell at index {}", cell_index),
    })?;
    if !cell.is_match() {
        return Err(Error::InvalidOptions {
            reason: "selected cell is not a match".to_string(),
        });
    }

    let flags = cell.match_info;
    let mut start = cell_index;
    while start > 0 && swath.cells[start - 1].match_info.contains(flags) {
        start -= 1;
    }

    let width = flags.highest_width();
    let addr = swath.address_of(start);
    write_scalar(mem, addr, value_bits, width, endianness)
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

    #[test]
    fn write_scalar_rejects_unsupported_width() {
        let mem = ProcessMemory::open_read_only(None).unwrap();
        let err = write_scalar(&mem, 0, 0, 3, Endianness::Native).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[test]
    fn targeted_write_rejects_non_matching_cell() {
        let mut swath = Swath::new(0x1000);
        swath.cells = vec![SwathCell::new(0)];
        let mut store = MatchStore::new();
        store.push_swath(swath);

        let mem = ProcessMemory::open_read_only(None).unwrap();
        let err = write_to_match_targeted(&mem, &store, 0, 0, 42, Endianness::Native).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[test]
    fn batch_write_attempts_once_per_matched_segment_not_per_cell() {
        let mut swath = Swath::new(0x1000);
        swath.cells = vec![SwathCell::new(0); 8];
        for cell in swath.cells[0..4].iter_mut() {
            cell.match_info = MatchFlags::S32;
        }
        for cell in swath.cells[4..8].iter_mut() {
            cell.match_info = MatchFlags::S32;
        }
        let mut store = MatchStore::new();
        store.push_swath(swath);

        let mem = ProcessMemory::open_read_only(None).unwrap();
        let report = write_to_matches_batch(&mem, &store, &2i32.to_ne_bytes());
        assert_eq!(report.success_count + report.failed_count, 2, "two 4-byte segments should attempt exactly two writes, not eight");
    }

    #[test]
    fn targeted_write_walks_back_to_segment_start() {
        let mut swath = Swath::new(0x1000);
        swath.cells = vec![SwathCell::new(0); 4];
        for cell in swath.cells.iter_mut() {
            cell.match_info = MatchFlags::U32;
        }
        let mut store = MatchStore::new();
        store.push_swath(swath);

        assert_eq!(store.swaths()[0].cells[3].match_info.highest_width(), 4);
    }
}
