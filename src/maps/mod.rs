//! Types for `/proc/[pid]/maps`.
//!
//! ```text
//!  /proc/[pid]/maps
//!               A file containing the currently mapped memory regions and
//!               their access permissions.  See mmap(2) for some further infor‐
//!               mation about memory mappings.
//!
//!               Permission to access this file is governed by a ptrace access
//!               mode PTRACE_MODE_READ_FSCREDS check; see ptrace(2).
//!
//!               The format of the file is:
//!
//!     address           perms offset  dev   inode       pathname
//!     00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon
//!     00651000-00652000 r--p 00051000 08:02 173521      /usr/bin/dbus-daemon
//!     00652000-00655000 rw-p 00052000 08:02 173521      /usr/bin/dbus-daemon
//!     00e03000-00e24000 rw-p 00000000 00:00 0           [heap]
//!     00e24000-011f7000 rw-p 00000000 00:00 0           [heap]
//!     ...
//!     35b1800000-35b1820000 r-xp 00000000 08:02 135522  /usr/lib64/ld-2.15.so
//!     35b1a1f000-35b1a20000 r--p 0001f000 08:02 135522  /usr/lib64/ld-2.15.so
//!     35b1a20000-35b1a21000 rw-p 00020000 08:02 135522  /usr/lib64/ld-2.15.so
//!     35b1a21000-35b1a22000 rw-p 00000000 00:00 0
//!     35b1c00000-35b1dac000 r-xp 00000000 08:02 135870  /usr/lib64/libc-2.15.so
//!     35b1dac000-35b1fac000 ---p 001ac000 08:02 135870  /usr/lib64/libc-2.15.so
//!     35b1fac000-35b1fb0000 r--p 001ac000 08:02 135870  /usr/lib64/libc-2.15.so
//!     35b1fb0000-35b1fb2000 rw-p 001b0000 08:02 135870  /usr/lib64/libc-2.15.so
//!     ...
//!     f2c6ff8c000-7f2c7078c000 rw-p 00000000 00:00 0    [stack:986]
//!     ...
//!     7fffb2c0d000-7fffb2c2e000 rw-p 00000000 00:00 0   [stack]
//!     7fffb2d48000-7fffb2d49000 r-xp 00000000 00:00 0   [vdso]
//!
//!               The address field is the address space in the process that the
//!               mapping occupies.  The perms field is a set of permissions:
//!
//!                   r = read
//!                   w = write
//!                   x = execute
//!                   s = shared
//!                   p = private (copy on write)
//!
//!               The offset field is the offset into the file/whatever; dev is
//!               the device (major:minor); inode is the inode on that device.
//!               0 indicates that no inode is associated with the memory
//!               region, as would be the case with BSS (uninitialized data).
//!
//!               The pathname field will usually be the file that is backing
//!               the mapping.  For ELF files, you can easily coordinate with
//!               the offset field by looking at the Offset field in the ELF
//!               program headers (readelf -l).
//!
//!               There are additional helpful pseudo-paths:
//!
//!               [stack]
//!                      The initial process's (also known as the main thread's)
//!                      stack.
//!
//!               [stack:<tid>] (from Linux 3.4 to 4.4)
//!                      A thread's stack (where the <tid> is a thread ID).  It
//!                      corresponds to the /proc/[pid]/task/[tid]/ path.  This
//!                      field was removed in Linux 4.5, since providing this
//!                      information for a process with large numbers of threads
//!                      is expensive.
//!
//!               [vdso] The virtual dynamically linked shared object.  See
//!                      vdso(7).
//!
//!               [heap] The process's heap.
//!
//!               If the pathname field is blank, this is an anonymous mapping
//!               as obtained via mmap(2).  There is no easy way to coordinate
//!               this back to a process's source, short of running it through
//!               gdb(1), strace(1), or similar.
//!
//!               pathname is shown unescaped except for newline characters,
//!               which are replaced with an octal escape sequence.  As a
//!               result, it is not possible to determine whether the original
//!               pathname contained a newline character or the literal \e012
//!               character sequence.
//!
//!               If the mapping is file-backed and the file has been deleted,
//!               the string " (deleted)" is appended to the pathname.  Note
//!               that this is ambiguous too.
//!
//!               Under Linux 2.0, there is no field giving pathname.
//! ```
pub mod column;

use self::column::{
    AddressRange,
    Device,
    Inode,
    Offset,
    PathName,
    PermSet,
};
use crate::{
    deps::{serde, log::warn},
    error::Error,
};
use std::{
    convert::TryFrom,
    fmt,
};

const PATHNAME_DISPLAY_RIGHT_PADDING: usize = 73;


/// ```text
///                                   +-- MappedRegion
///                                   |
/// +---------------------------------+---------------------------------------------------------------------+
/// V                                                                                                       V
/// 7fa281f3f000-7fa281f42000 r-xp 00000000 103:01 270269                    /usr/lib64/zsh/5.5.1/zsh/stat.so
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MappedRegion {
    addr_range: AddressRange,
    perms:      PermSet,
    offset:     Offset,
    device:     Device,
    inode:      Inode,
    pathname:   PathName,
    extra:      Vec<String>,
}


impl MappedRegion {
    pub const fn addr_range(&self) -> &AddressRange {
        &self.addr_range
    }

    pub const fn perms(&self) -> &PermSet {
        &self.perms
    }

    pub const fn offset(&self) -> Offset {
        self.offset
    }

    pub const fn device(&self) -> &Device {
        &self.device
    }

    pub const fn inode(&self) -> Inode {
        self.inode
    }

    pub const fn pathname(&self) -> &PathName {
        &self.pathname
    }

    pub fn extra(&self) -> &[String] {
        self.extra.as_slice()
    }
}


impl fmt::Display for MappedRegion {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        let s = format!(
            "{} {} {} {} {}",
            self.addr_range, self.perms, self.offset, self.device, self.inode
        );
        s.fmt(f)?;
        match &self.pathname {
            PathName::Empty => Ok(()),
            _path => {
                let pad = PATHNAME_DISPLAY_RIGHT_PADDING.checked_sub(s.len()).unwrap_or(0);
                let pad_ws = unsafe { String::from_utf8_unchecked(vec![b' '; pad]) };
                pad_ws.fmt(f)?;
                self.pathname.fmt(f)
            }
        }
    }
}


impl<'a> TryFrom<&'a str> for MappedRegion {
    type Error = Error;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::Parse {
                value:    value.to_string(),
                typename: std::any::type_name::<MappedRegion>(),
                reason:   "blank string".to_string(),
            });
        }

        let mut iter = trimmed.split_ascii_whitespace();

        let addr_range = AddressRange::try_from(iter.next().unwrap_or(""))?;
        let perms = PermSet::try_from(iter.next().unwrap_or(""))?;
        let offset = Offset::try_from(iter.next().unwrap_or(""))?;
        let device = Device::try_from(iter.next().unwrap_or(""))?;
        let inode = Inode::try_from(iter.next().unwrap_or(""))?;
        let pathname = PathName::try_from(iter.next().unwrap_or(""))?;
        // extra garbage we couldn't parse
        let extra = iter.map(str::to_string).collect::<Vec<_>>();

        if !extra.is_empty() {
            warn!(
                "unexpected extra fields were encountered while parsing this line - line={:?}; extra={:?}",
                value, extra
            );
        }

        Ok(MappedRegion {
            addr_range,
            perms,
            offset,
            device,
            inode,
            pathname,
            extra,
        })
    }
}


#[test]
fn test_parse() {
    const EXAMPLE_PROC_MAPS: &'static str = r#"00400000-004c0000 r-xp 00000000 103:01 270237                            /usr/bin/zsh
006bf000-006c0000 r--p 000bf000 103:01 270237                            /usr/bin/zsh
006c0000-006c7000 rw-p 000c0000 103:01 270237                            /usr/bin/zsh
006c7000-006da000 rw-p 00000000 00:00 0
00e08000-01135000 rw-p 00000000 00:00 0                                  [heap]
7ffce82d7000-7ffce831f000 rw-p 00000000 00:00 0                          [stack]
7ffce83c1000-7ffce83c4000 r--p 00000000 00:00 0                          [vvar]
7ffce83c4000-7ffce83c6000 r-xp 00000000 00:00 0                          [vdso]
ffffffffff600000-ffffffffff601000 r-xp 00000000 00:00 0                  [vsyscall]
"#;

    for line in EXAMPLE_PROC_MAPS.lines() {
        let region = MappedRegion::try_from(line).unwrap();
        assert_eq!(format!("{}", region), line);
    }
}
