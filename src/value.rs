//! [`UserValue`] and [`OldValue`]: the two byte-bearing inputs a scan routine
//! consults besides the memory it is currently reading.

use crate::flags::MatchFlags;

/// A value supplied by the caller for predicates in the "with user value"
/// family (`EqualTo`, `Range`, `Regex`, ...). Only the fields relevant to
/// the active [`crate::scan_type::ScanDataType`] need to be populated;
/// `flags` records which numeric widths actually carry meaningful low/high
/// pairs, so a routine built for `I32` will refuse a `UserValue` that was
/// only populated for `F64`.
#[derive(Clone, Debug, Default)]
pub struct UserValue {
    pub flags: MatchFlags,

    i8_low: i8,
    i8_high: i8,
    u8_low: u8,
    u8_high: u8,
    i16_low: i16,
    i16_high: i16,
    u16_low: u16,
    u16_high: u16,
    i32_low: i32,
    i32_high: i32,
    u32_low: u32,
    u32_high: u32,
    i64_low: i64,
    i64_high: i64,
    u64_low: u64,
    u64_high: u64,
    f32_low: f32,
    f32_high: f32,
    f64_low: f64,
    f64_high: f64,

    /// Needle for byte-array / string prefix compares.
    pub bytes: Option<Vec<u8>>,
    /// Wildcard mask, same length as `bytes`: `0xFF` = must match, `0x00` =
    /// don't care.
    pub mask: Option<Vec<u8>>,
    /// Needle for string prefix compares, and the pattern source for
    /// `Regex`.
    pub string: Option<String>,
}

/// A numeric primitive that can be stored in a [`UserValue`]'s low/high
/// pair and whose presence is tracked by a single [`MatchFlags`] bit.
pub trait NumericField: Copy {
    const FLAG: MatchFlags;

    fn low(value: &UserValue) -> Self;
    fn high(value: &UserValue) -> Self;
    fn set_range(
        value: &mut UserValue,
        low: Self,
        high: Self,
    );
}

macro_rules! impl_numeric_field {
    ($ty:ty, $flag:expr, $low_field:ident, $high_field:ident) => {
        impl NumericField for $ty {
            const FLAG: MatchFlags = $flag;

            fn low(value: &UserValue) -> Self {
                value.$low_field
            }

            fn high(value: &UserValue) -> Self {
                value.$high_field
            }

            fn set_range(
                value: &mut UserValue,
                low: Self,
                high: Self,
            ) {
                value.$low_field = low;
                value.$high_field = high;
                value.flags |= Self::FLAG;
            }
        }
    };
}

impl_numeric_field!(i8, MatchFlags::S8, i8_low, i8_high);
impl_numeric_field!(u8, MatchFlags::U8, u8_low, u8_high);
impl_numeric_field!(i16, MatchFlags::S16, i16_low, i16_high);
impl_numeric_field!(u16, MatchFlags::U16, u16_low, u16_high);
impl_numeric_field!(i32, MatchFlags::S32, i32_low, i32_high);
impl_numeric_field!(u32, MatchFlags::U32, u32_low, u32_high);
impl_numeric_field!(i64, MatchFlags::S64, i64_low, i64_high);
impl_numeric_field!(u64, MatchFlags::U64, u64_low, u64_high);
impl_numeric_field!(f32, MatchFlags::F32, f32_low, f32_high);
impl_numeric_field!(f64, MatchFlags::F64, f64_low, f64_high);

impl UserValue {
    /// A scalar value (`EqualTo`, `GreaterThan`, `IncreasedBy`, ...): low
    /// and high are the same.
    pub fn scalar<T: NumericField>(value: T) -> Self {
        let mut uv = UserValue::default();
        T::set_range(&mut uv, value, value);
        uv
    }

    /// A range value; order of `low`/`high` does not matter, the routine
    /// swaps them if needed.
    pub fn range<T: NumericField>(
        low: T,
        high: T,
    ) -> Self {
        let mut uv = UserValue::default();
        T::set_range(&mut uv, low, high);
        uv
    }

    pub fn byte_pattern(
        bytes: Vec<u8>,
        mask: Option<Vec<u8>>,
    ) -> Self {
        UserValue {
            flags: MatchFlags::B8,
            bytes: Some(bytes),
            mask,
            ..Default::default()
        }
    }

    pub fn string(pattern: impl Into<String>) -> Self {
        UserValue {
            flags: MatchFlags::B8,
            string: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn low<T: NumericField>(&self) -> T {
        T::low(self)
    }

    pub fn high<T: NumericField>(&self) -> T {
        T::high(self)
    }

    pub fn has<T: NumericField>(&self) -> bool {
        self.flags.contains(T::FLAG)
    }
}

/// The byte run recorded the last time the engine streamed through a
/// location, used by "changed/increased/decreased by N" predicates. `flags`
/// records which scalar widths `bytes` is long enough, and was captured
/// widely enough, to decode.
#[derive(Clone, Debug, Default)]
pub struct OldValue {
    pub flags: MatchFlags,
    pub bytes: Vec<u8>,
}

impl OldValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        OldValue {
            flags: MatchFlags::ALL,
            bytes,
        }
    }

    pub fn has_width(
        &self,
        width: usize,
    ) -> bool {
        self.bytes.len() >= width
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_roundtrips_through_numeric_field() {
        let uv = UserValue::scalar::<i32>(-42);
        assert!(uv.has::<i32>());
        assert_eq!(uv.low::<i32>(), -42);
        assert_eq!(uv.high::<i32>(), -42);
        assert!(!uv.has::<f64>());
    }

    #[test]
    fn range_stores_both_ends_unordered() {
        let uv = UserValue::range::<i32>(150, 50);
        assert_eq!(uv.low::<i32>(), 150);
        assert_eq!(uv.high::<i32>(), 50);
    }

    #[test]
    fn old_value_width_check() {
        let old = OldValue::new(vec![1, 2, 3, 4]);
        assert!(old.has_width(4));
        assert!(!old.has_width(8));
    }
}
