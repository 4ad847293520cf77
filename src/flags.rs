//! `MatchFlags`: the compact bit-set recording the width/signedness/float-ness
//! of a recorded match. Doubles as the "capability set" carried by
//! [`crate::value::UserValue`] and [`crate::value::OldValue`] to say which
//! scalar widths they have bytes for.

use std::fmt;

use crate::deps::serde;

macro_rules! flags {
    ($($name:ident = $bit:expr),+ $(,)?) => {
        $(pub const $name: MatchFlags = MatchFlags($bit);)+
    };
}

/// A 16-bit set of per-width/type bits. `Empty` means "no match here / not
/// yet matched", the zero value of the set.
#[derive(Copy, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct MatchFlags(u16);

impl MatchFlags {
    flags! {
        EMPTY = 0,
        U8    = 1 << 0,
        S8    = 1 << 1,
        U16   = 1 << 2,
        S16   = 1 << 3,
        U32   = 1 << 4,
        S32   = 1 << 5,
        U64   = 1 << 6,
        S64   = 1 << 7,
        F32   = 1 << 8,
        F64   = 1 << 9,
    }

    pub const B8: MatchFlags = MatchFlags(Self::U8.0 | Self::S8.0);
    pub const B16: MatchFlags = MatchFlags(Self::U16.0 | Self::S16.0);
    pub const B32: MatchFlags = MatchFlags(Self::U32.0 | Self::S32.0 | Self::F32.0);
    pub const B64: MatchFlags = MatchFlags(Self::U64.0 | Self::S64.0 | Self::F64.0);
    pub const INTEGER: MatchFlags = MatchFlags(
        Self::U8.0 | Self::S8.0 | Self::U16.0 | Self::S16.0 | Self::U32.0 | Self::S32.0 | Self::U64.0 | Self::S64.0,
    );
    pub const FLOAT: MatchFlags = MatchFlags(Self::F32.0 | Self::F64.0);
    pub const ALL: MatchFlags = MatchFlags(Self::INTEGER.0 | Self::FLOAT.0);

    pub const fn empty() -> Self {
        Self::EMPTY
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: MatchFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: MatchFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: MatchFlags) -> Self {
        MatchFlags(self.0 | other.0)
    }

    /// The byte width implied by the highest-order width bit set, used by
    /// the targeted write path to size a contiguous matched segment.
    pub const fn highest_width(self) -> usize {
        if self.intersects(Self::B64) {
            8
        } else if self.intersects(Self::B32) {
            4
        } else if self.intersects(Self::B16) {
            2
        } else {
            1
        }
    }
}

impl std::ops::BitOr for MatchFlags {
    type Output = MatchFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for MatchFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for MatchFlags {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        write!(f, "MatchFlags({:#06x})", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_and_contains() {
        let f = MatchFlags::U32 | MatchFlags::F32;
        assert!(f.contains(MatchFlags::U32));
        assert!(f.contains(MatchFlags::F32));
        assert!(!f.contains(MatchFlags::U64));
    }

    #[test]
    fn highest_width_prefers_wider_bits() {
        assert_eq!((MatchFlags::U8 | MatchFlags::U64).highest_width(), 8);
        assert_eq!(MatchFlags::U32.highest_width(), 4);
        assert_eq!(MatchFlags::S16.highest_width(), 2);
        assert_eq!(MatchFlags::S8.highest_width(), 1);
        assert_eq!(MatchFlags::EMPTY.highest_width(), 1);
    }

    #[test]
    fn empty_is_default() {
        assert!(MatchFlags::default().is_empty());
    }
}
