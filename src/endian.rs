//! Endianness-aware scalar reads and the numeric tolerance primitives used by
//! the float comparison routines.

use crate::deps::serde;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Endianness {
    Little,
    Big,
    Native,
}

impl Endianness {
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// `reverse_endianness=true` in scan options means "read as the
    /// non-native endianness".
    pub fn from_reverse_flag(reverse: bool) -> Self {
        if reverse {
            match Self::host() {
                Endianness::Little => Endianness::Big,
                Endianness::Big => Endianness::Little,
                Endianness::Native => Endianness::Native,
            }
        } else {
            Endianness::Native
        }
    }

    fn swap_needed(self) -> bool {
        match self {
            Endianness::Native => false,
            Endianness::Little => Endianness::host() != Endianness::Little,
            Endianness::Big => Endianness::host() != Endianness::Big,
        }
    }
}

macro_rules! impl_read {
    ($fn_name:ident, $ty:ty) => {
        /// Reads a `
        #[doc = stringify!($ty)]
        /// ` from the front of `buf`, honoring `endianness`. Panics if
        /// `buf` is shorter than `size_of::<$ty>()`; callers are expected to
        /// have checked `bytes_needed` first.
        pub fn $fn_name(
            buf: &[u8],
            endianness: Endianness,
        ) -> $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let mut bytes = [0u8; WIDTH];
            bytes.copy_from_slice(&buf[..WIDTH]);
            let native = <$ty>::from_ne_bytes(bytes);
            if endianness.swap_needed() {
                native.swap_bytes()
            } else {
                native
            }
        }
    };
}

impl_read!(read_u8, u8);
impl_read!(read_i8, i8);
impl_read!(read_u16, u16);
impl_read!(read_i16, i16);
impl_read!(read_u32, u32);
impl_read!(read_i32, i32);
impl_read!(read_u64, u64);
impl_read!(read_i64, i64);

pub fn read_f32(
    buf: &[u8],
    endianness: Endianness,
) -> f32 {
    f32::from_bits(read_u32(buf, endianness))
}

pub fn read_f64(
    buf: &[u8],
    endianness: Endianness,
) -> f64 {
    f64::from_bits(read_u64(buf, endianness))
}

macro_rules! impl_write {
    ($fn_name:ident, $ty:ty) => {
        pub fn $fn_name(
            value: $ty,
            endianness: Endianness,
        ) -> [u8; std::mem::size_of::<$ty>()] {
            let native = if endianness.swap_needed() {
                value.swap_bytes()
            } else {
                value
            };
            native.to_ne_bytes()
        }
    };
}

impl_write!(write_u8, u8);
impl_write!(write_i8, i8);
impl_write!(write_u16, u16);
impl_write!(write_i16, i16);
impl_write!(write_u32, u32);
impl_write!(write_i32, i32);
impl_write!(write_u64, u64);
impl_write!(write_i64, i64);

pub fn write_f32(
    value: f32,
    endianness: Endianness,
) -> [u8; 4] {
    write_u32(value.to_bits(), endianness)
}

pub fn write_f64(
    value: f64,
    endianness: Endianness,
) -> [u8; 8] {
    write_u64(value.to_bits(), endianness)
}

pub const ABS_TOL_F32: f32 = 1e-6;
pub const ABS_TOL_F64: f64 = 1e-12;
pub const REL_TOL_F32: f32 = 1e-5;
pub const REL_TOL_F64: f64 = 1e-12;

/// `max(abs_tol, rel_tol * max(1, |a|, |b|))`
pub fn f32_close(
    a: f32,
    b: f32,
) -> bool {
    let scale = 1.0f32.max(a.abs()).max(b.abs());
    let tol = ABS_TOL_F32.max(REL_TOL_F32 * scale);
    (a - b).abs() <= tol
}

pub fn f64_close(
    a: f64,
    b: f64,
) -> bool {
    let scale = 1.0f64.max(a.abs()).max(b.abs());
    let tol = ABS_TOL_F64.max(REL_TOL_F64 * scale);
    (a - b).abs() <= tol
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_reversed_endianness() {
        let endianness = Endianness::from_reverse_flag(true);
        let v: u32 = 0xdeadbeef;
        let bytes = write_u32(v, endianness);
        assert_eq!(read_u32(&bytes, endianness), v);
    }

    #[test]
    fn round_trip_native_endianness() {
        let endianness = Endianness::from_reverse_flag(false);
        let v: i64 = -123456789;
        let bytes = write_i64(v, endianness);
        assert_eq!(read_i64(&bytes, endianness), v);
    }

    #[test]
    fn float_tolerance_accepts_small_drift() {
        assert!(f32_close(3.14159, 3.141590001));
        assert!(!f32_close(3.14159, 3.16));
    }

    #[test]
    fn float_tolerance_scales_with_magnitude() {
        assert!(f64_close(1.0e10, 1.0e10 + 1.0e-3));
        assert!(!f64_close(1.0, 1.0 + 1.0e-6));
    }
}
