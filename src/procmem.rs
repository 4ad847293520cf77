//! Process-memory I/O (C4): positional read/write against an opened
//! `/proc/<pid>/mem` handle, tolerant of short reads across unreadable
//! pages.

use std::{
    fs::{
        File,
        OpenOptions,
    },
    io,
    os::unix::fs::FileExt,
};

use crate::{
    deps::log::{
        debug,
        trace,
        warn,
    },
    error::Error,
    paths,
};

fn is_expected_fault(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EIO) | Some(libc::EFAULT) | Some(libc::EPERM) | Some(libc::EACCES)
    )
}

/// One process's `/proc/<pid>/mem`. Scoped: opened for exactly as long as a
/// worker or session needs it, released on drop. No shared state — each
/// worker thread holds its own handle.
pub struct ProcessMemory {
    file: File,
    pid: Option<u32>,
    writable: bool,
}

impl ProcessMemory {
    pub fn open_read_only(pid: Option<u32>) -> Result<Self, Error> {
        Self::open(pid, false)
    }

    pub fn open_read_write(pid: Option<u32>) -> Result<Self, Error> {
        Self::open(pid, true)
    }

    fn open(
        pid: Option<u32>,
        writable: bool,
    ) -> Result<Self, Error> {
        let path = paths::proc_pid_mem_path(pid);
        debug!("opening {} (writable={})", path.display(), writable);

        let file = OpenOptions::new().read(true).write(writable).open(&path).map_err(|err| match err.kind() {
            io::ErrorKind::PermissionDenied => Error::Permission {
                pid: pid.unwrap_or(0),
                reason: err.to_string(),
            },
            _ => Error::TargetUnavailable {
                reason: format!("could not open {}: {}", path.display(), err),
            },
        })?;

        Ok(ProcessMemory { file, pid, writable })
    }

    /// Reads up to `buf.len()` bytes starting at `addr`. Short reads caused
    /// by an unreadable page are tolerated and returned as-is (not an
    /// error); any other error is a hard failure. A zero-byte return means
    /// the read hit an unreadable boundary immediately, and the caller
    /// should stop advancing through this range.
    pub fn read(
        &self,
        addr: u64,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        match self.file.read_at(buf, addr) {
            Ok(n) => Ok(n),
            Err(err) if is_expected_fault(&err) => {
                trace!("short read at {:#x}: {}", addr, err);
                Ok(0)
            }
            Err(err) => {
                warn!("read error at {:#x}: {}", addr, err);
                Err(Error::IORead { address: addr, source: err })
            }
        }
    }

    /// Writes `buf` starting at `addr`, retrying on short writes. A hard
    /// error propagates; a short write that never completes is reported as
    /// `IOPartial`.
    pub fn write(
        &self,
        addr: u64,
        buf: &[u8],
    ) -> Result<(), Error> {
        let mut written = 0usize;
        while written < buf.len() {
            let n = self.file.write_at(&buf[written..], addr + written as u64).map_err(|err| {
                warn!("write error at {:#x}: {}", addr + written as u64, err);
                Error::from(err)
            })?;
            if n == 0 {
                return Err(Error::IOPartial {
                    address: addr,
                    wrote: written,
                    requested: buf.len(),
                });
            }
            written += n;
        }
        Ok(())
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn open_self_read_only_succeeds() {
        let mem = ProcessMemory::open_read_only(None).expect("should open /proc/self/mem");
        assert!(!mem.is_writable());
    }

    #[test]
    fn reading_own_stack_variable_round_trips() {
        let needle: u32 = 0x1357_9bdf;
        let addr = &needle as *const u32 as u64;

        let mem = ProcessMemory::open_read_only(None).unwrap();
        let mut buf = [0u8; 4];
        let n = mem.read(addr, &mut buf).expect("read should succeed");
        assert_eq!(n, 4);
        assert_eq!(u32::from_ne_bytes(buf), needle);
    }

    #[test]
    fn is_expected_fault_recognizes_common_errnos() {
        let err = io::Error::from_raw_os_error(libc::EIO);
        assert!(is_expected_fault(&err));
        let err = io::Error::from_raw_os_error(libc::ENOENT);
        assert!(!is_expected_fault(&err));
    }
}
