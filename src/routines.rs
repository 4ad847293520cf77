//! The scan-routine factory (C7): for each `(data_type, match_type,
//! endianness)` triple, produces a callable with the fixed signature
//!
//! ```text
//! match(mem_view, old_value?, user_value?, out_flags) -> matched_bytes
//! ```
//!
//! `mem_view`'s length stands in for the design's separate `mem_len`
//! parameter (a Rust slice already carries its length).

use std::{
    cell::RefCell,
    collections::HashMap,
    sync::Arc,
};

use crate::{
    deps::regex,
    endian::{
        self,
        Endianness,
    },
    error::Error,
    flags::MatchFlags,
    scan_type::{
        ScanDataType,
        ScanMatchType,
    },
    value::{
        NumericField,
        OldValue,
        UserValue,
    },
};

pub type RoutineFn = dyn Fn(&[u8], Option<&OldValue>, Option<&UserValue>, &mut MatchFlags) -> usize + Send + Sync;
pub type Routine = Arc<RoutineFn>;

/// A numeric primitive usable by the per-location match routines: knows its
/// own width, how to read itself off a byte buffer, and tolerance-aware
/// comparisons (exact for integers, tolerant for floats).
trait Scalar: NumericField + PartialOrd {
    const WIDTH: usize;

    fn read(
        buf: &[u8],
        endianness: Endianness,
    ) -> Self;

    fn is_equal(
        a: Self,
        b: Self,
    ) -> bool;

    /// Strict `a < b`, and for floats, not within tolerance of `b`.
    fn is_less(
        a: Self,
        b: Self,
    ) -> bool;

    /// Strict `a > b`, and for floats, not within tolerance of `b`.
    fn is_greater(
        a: Self,
        b: Self,
    ) -> bool;

    /// Inclusive `[low, high]`; for floats, widened by the type's absolute
    /// tolerance on both ends.
    fn in_range(
        v: Self,
        low: Self,
        high: Self,
    ) -> bool;

    /// `new - old == delta`, wrapping for integers, tolerance-aware for
    /// floats.
    fn delta_equals(
        new: Self,
        old: Self,
        delta: Self,
    ) -> bool;
}

fn order<T: PartialOrd>(
    a: T,
    b: T,
) -> (T, T) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

macro_rules! impl_scalar_int {
    ($ty:ty, $read_fn:path) => {
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn read(
                buf: &[u8],
                endianness: Endianness,
            ) -> Self {
                $read_fn(buf, endianness)
            }

            fn is_equal(
                a: Self,
                b: Self,
            ) -> bool {
                a == b
            }

            fn is_less(
                a: Self,
                b: Self,
            ) -> bool {
                a < b
            }

            fn is_greater(
                a: Self,
                b: Self,
            ) -> bool {
                a > b
            }

            fn in_range(
                v: Self,
                low: Self,
                high: Self,
            ) -> bool {
                let (low, high) = order(low, high);
                v >= low && v <= high
            }

            fn delta_equals(
                new: Self,
                old: Self,
                delta: Self,
            ) -> bool {
                new.wrapping_sub(old) == delta
            }
        }
    };
}

impl_scalar_int!(i8, endian::read_i8);
impl_scalar_int!(u8, endian::read_u8);
impl_scalar_int!(i16, endian::read_i16);
impl_scalar_int!(u16, endian::read_u16);
impl_scalar_int!(i32, endian::read_i32);
impl_scalar_int!(u32, endian::read_u32);
impl_scalar_int!(i64, endian::read_i64);
impl_scalar_int!(u64, endian::read_u64);

macro_rules! impl_scalar_float {
    ($ty:ty, $read_fn:path, $close_fn:path, $abs_tol:expr) => {
        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn read(
                buf: &[u8],
                endianness: Endianness,
            ) -> Self {
                $read_fn(buf, endianness)
            }

            fn is_equal(
                a: Self,
                b: Self,
            ) -> bool {
                $close_fn(a, b)
            }

            fn is_less(
                a: Self,
                b: Self,
            ) -> bool {
                a < b && !$close_fn(a, b)
            }

            fn is_greater(
                a: Self,
                b: Self,
            ) -> bool {
                a > b && !$close_fn(a, b)
            }

            fn in_range(
                v: Self,
                low: Self,
                high: Self,
            ) -> bool {
                let (low, high) = order(low, high);
                v >= low - $abs_tol && v <= high + $abs_tol
            }

            fn delta_equals(
                new: Self,
                old: Self,
                delta: Self,
            ) -> bool {
                $close_fn(new - old, delta)
            }
        }
    };
}

impl_scalar_float!(f32, endian::read_f32, endian::f32_close, endian::ABS_TOL_F32);
impl_scalar_float!(f64, endian::read_f64, endian::f64_close, endian::ABS_TOL_F64);

fn scalar_routine<T: Scalar + Send + Sync + 'static>(
    match_type: ScanMatchType,
    endianness: Endianness,
) -> Routine {
    Arc::new(move |buf, old, user, out_flags| {
        if buf.len() < T::WIDTH {
            return 0;
        }

        if match_type.needs_user_value() {
            let ok = matches!(user, Some(u) if u.has::<T>());
            if !ok {
                return 0;
            }
        }

        let old_value: Option<T> = if match_type.uses_old_value() {
            match old {
                Some(o) if o.flags.contains(T::FLAG) && o.has_width(T::WIDTH) => Some(T::read(&o.bytes, endianness)),
                _ => return 0,
            }
        } else {
            None
        };

        let current = T::read(buf, endianness);

        let matched = match match_type {
            ScanMatchType::Any => true,
            ScanMatchType::EqualTo => T::is_equal(current, user.unwrap().low::<T>()),
            ScanMatchType::NotEqualTo => !T::is_equal(current, user.unwrap().low::<T>()),
            ScanMatchType::GreaterThan => T::is_greater(current, user.unwrap().low::<T>()),
            ScanMatchType::LessThan => T::is_less(current, user.unwrap().low::<T>()),
            ScanMatchType::Range => {
                let u = user.unwrap();
                T::in_range(current, u.low::<T>(), u.high::<T>())
            }
            ScanMatchType::Update | ScanMatchType::NotChanged => T::is_equal(current, old_value.unwrap()),
            ScanMatchType::Changed => !T::is_equal(current, old_value.unwrap()),
            ScanMatchType::Increased => T::is_greater(current, old_value.unwrap()),
            ScanMatchType::Decreased => T::is_less(current, old_value.unwrap()),
            ScanMatchType::IncreasedBy => T::delta_equals(current, old_value.unwrap(), user.unwrap().low::<T>()),
            ScanMatchType::DecreasedBy => T::delta_equals(old_value.unwrap(), current, user.unwrap().low::<T>()),
            ScanMatchType::Regex => false,
        };

        if matched {
            *out_flags = T::FLAG;
            T::WIDTH
        } else {
            0
        }
    })
}

/// Runs each width's routine in turn, in the caller-supplied descending
/// order, and stops at the first that matches. Later widths are never
/// attempted once an earlier one wins — this ordering is load-bearing.
fn first_match_routine(routines: Vec<Routine>) -> Routine {
    Arc::new(move |buf, old, user, out_flags| {
        for routine in &routines {
            let matched = routine(buf, old, user, out_flags);
            if matched > 0 {
                return matched;
            }
        }
        0
    })
}

fn any_integer_routine(
    match_type: ScanMatchType,
    endianness: Endianness,
) -> Routine {
    first_match_routine(vec![
        scalar_routine::<u64>(match_type, endianness),
        scalar_routine::<i64>(match_type, endianness),
        scalar_routine::<u32>(match_type, endianness),
        scalar_routine::<i32>(match_type, endianness),
        scalar_routine::<u16>(match_type, endianness),
        scalar_routine::<i16>(match_type, endianness),
        scalar_routine::<u8>(match_type, endianness),
        scalar_routine::<i8>(match_type, endianness),
    ])
}

fn any_float_routine(
    match_type: ScanMatchType,
    endianness: Endianness,
) -> Routine {
    first_match_routine(vec![
        scalar_routine::<f64>(match_type, endianness),
        scalar_routine::<f32>(match_type, endianness),
    ])
}

fn any_number_routine(
    match_type: ScanMatchType,
    endianness: Endianness,
) -> Routine {
    first_match_routine(vec![
        scalar_routine::<f64>(match_type, endianness),
        scalar_routine::<f32>(match_type, endianness),
        scalar_routine::<u64>(match_type, endianness),
        scalar_routine::<i64>(match_type, endianness),
        scalar_routine::<u32>(match_type, endianness),
        scalar_routine::<i32>(match_type, endianness),
        scalar_routine::<u16>(match_type, endianness),
        scalar_routine::<i16>(match_type, endianness),
        scalar_routine::<u8>(match_type, endianness),
        scalar_routine::<i8>(match_type, endianness),
    ])
}

/// `Any` matches the whole readable span; otherwise a masked prefix compare
/// against `user_value.bytes` at the current position (not a search).
fn byte_array_routine(match_type: ScanMatchType) -> Result<Routine, Error> {
    match match_type {
        ScanMatchType::Any => Ok(Arc::new(|buf, _old, _user, out_flags| {
            if buf.is_empty() {
                return 0;
            }
            *out_flags = MatchFlags::B8;
            buf.len()
        })),
        ScanMatchType::EqualTo | ScanMatchType::NotChanged | ScanMatchType::Update => {
            Ok(Arc::new(|buf, _old, user, out_flags| {
                let Some(user) = user else { return 0 };
                let Some(needle) = user.bytes.as_deref() else { return 0 };
                if needle.is_empty() || buf.len() < needle.len() {
                    return 0;
                }

                let matched = match user.mask.as_deref() {
                    Some(mask) if mask.len() == needle.len() => buf
                        .iter()
                        .zip(needle.iter())
                        .zip(mask.iter())
                        .all(|((&hay, &want), &bit)| (hay ^ want) & bit == 0),
                    _ => &buf[..needle.len()] == needle,
                };

                if matched {
                    *out_flags = MatchFlags::B8;
                    needle.len()
                } else {
                    0
                }
            }))
        }
        other => Err(Error::InvalidOptions {
            reason: format!("ByteArray has no routine for match type {:?}", other),
        }),
    }
}

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Option<regex::bytes::Regex>>> = RefCell::new(HashMap::new());
}

fn with_cached_regex<R>(
    pattern: &str,
    f: impl FnOnce(Option<&regex::bytes::Regex>) -> R,
) -> R {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let compiled = cache.entry(pattern.to_string()).or_insert_with(|| {
            regex::bytes::Regex::new(pattern)
                .map_err(|err| {
                    log::warn!("could not compile regex pattern {:?}: {}", pattern, err);
                })
                .ok()
        });
        f(compiled.as_ref())
    })
}

/// Same prefix-compare-at-current-position semantics as byte arrays, plus
/// `Regex` which searches the whole readable span for the pattern's first
/// match.
fn string_routine(match_type: ScanMatchType) -> Result<Routine, Error> {
    match match_type {
        ScanMatchType::Any => Ok(Arc::new(|buf, _old, _user, out_flags| {
            if buf.is_empty() {
                return 0;
            }
            *out_flags = MatchFlags::B8;
            buf.len()
        })),
        ScanMatchType::EqualTo | ScanMatchType::NotChanged | ScanMatchType::Update => {
            Ok(Arc::new(|buf, _old, user, out_flags| {
                let Some(needle) = user.and_then(|u| u.string.as_deref()) else {
                    return 0;
                };
                let needle = needle.as_bytes();
                if needle.is_empty() || buf.len() < needle.len() {
                    return 0;
                }
                if &buf[..needle.len()] == needle {
                    *out_flags = MatchFlags::B8;
                    needle.len()
                } else {
                    0
                }
            }))
        }
        ScanMatchType::Regex => Ok(Arc::new(|buf, _old, user, out_flags| {
            let Some(pattern) = user.and_then(|u| u.string.as_deref()) else {
                return 0;
            };
            with_cached_regex(pattern, |compiled| match compiled {
                Some(re) => match re.find(buf) {
                    Some(m) if m.start() == 0 => {
                        *out_flags = MatchFlags::B8;
                        m.end()
                    }
                    Some(m) => {
                        *out_flags = MatchFlags::B8;
                        m.end() - m.start()
                    }
                    None => 0,
                },
                None => 0,
            })
        })),
        other => Err(Error::InvalidOptions {
            reason: format!("String has no routine for match type {:?}", other),
        }),
    }
}

/// Builds the per-location match routine for a `(data_type, match_type,
/// endianness)` triple. `InvalidOptions` if that combination has no
/// routine.
pub fn build_routine(
    data_type: ScanDataType,
    match_type: ScanMatchType,
    endianness: Endianness,
) -> Result<Routine, Error> {
    use ScanDataType::*;

    if matches!(match_type, ScanMatchType::Regex) && !matches!(data_type, String) {
        return Err(Error::InvalidOptions {
            reason: "Regex is only valid for the String data type".to_string(),
        });
    }

    match data_type {
        I8 => Ok(scalar_routine::<i8>(match_type, endianness)),
        I16 => Ok(scalar_routine::<i16>(match_type, endianness)),
        I32 => Ok(scalar_routine::<i32>(match_type, endianness)),
        I64 => Ok(scalar_routine::<i64>(match_type, endianness)),
        F32 => Ok(scalar_routine::<f32>(match_type, endianness)),
        F64 => Ok(scalar_routine::<f64>(match_type, endianness)),
        AnyInteger => Ok(any_integer_routine(match_type, endianness)),
        AnyFloat => Ok(any_float_routine(match_type, endianness)),
        AnyNumber => Ok(any_number_routine(match_type, endianness)),
        ByteArray => byte_array_routine(match_type),
        String => string_routine(match_type),
    }
}

/// First-occurrence search helpers used by higher-level, whole-region
/// pattern scans; not used by the per-location engine itself.
pub fn find_pattern(
    haystack: &[u8],
    needle: &[u8],
) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn find_pattern_masked(
    haystack: &[u8],
    needle: &[u8],
    mask: &[u8],
) -> Option<usize> {
    if needle.is_empty() || mask.len() != needle.len() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.iter().zip(needle).zip(mask).all(|((&h, &n), &m)| (h ^ n) & m == 0))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::{
        OldValue,
        UserValue,
    };

    fn flags() -> MatchFlags {
        MatchFlags::empty()
    }

    #[test]
    fn equal_to_i8_matches_repeating_pattern() {
        let routine = build_routine(ScanDataType::I8, ScanMatchType::EqualTo, Endianness::Native).unwrap();
        let user = UserValue::scalar::<i8>(42);
        let mut out = flags();
        assert_eq!(routine(&[42], None, Some(&user), &mut out), 1);
        assert!(out.contains(MatchFlags::S8));

        let mut out = flags();
        assert_eq!(routine(&[7], None, Some(&user), &mut out), 0);
    }

    #[test]
    fn float_equal_to_respects_tolerance() {
        let routine = build_routine(ScanDataType::F32, ScanMatchType::EqualTo, Endianness::Native).unwrap();
        let user = UserValue::scalar::<f32>(3.141590001);
        let bytes = 3.14159f32.to_ne_bytes();
        let mut out = flags();
        assert_eq!(routine(&bytes, None, Some(&user), &mut out), 4);

        let user_far = UserValue::scalar::<f32>(3.16);
        let mut out = flags();
        assert_eq!(routine(&bytes, None, Some(&user_far), &mut out), 0);
    }

    #[test]
    fn range_is_symmetric_in_low_high_order() {
        let routine = build_routine(ScanDataType::I32, ScanMatchType::Range, Endianness::Native).unwrap();
        let in_range = 75i32.to_ne_bytes();
        let out_of_range = 150i32.to_ne_bytes();

        for user in [UserValue::range::<i32>(50, 100), UserValue::range::<i32>(100, 50)] {
            let mut out = flags();
            assert_eq!(routine(&in_range, None, Some(&user), &mut out), 4);
            let mut out = flags();
            assert_eq!(routine(&out_of_range, None, Some(&user), &mut out), 0);
        }
    }

    #[test]
    fn increased_by_checks_delta_against_old_value() {
        let routine = build_routine(ScanDataType::I32, ScanMatchType::IncreasedBy, Endianness::Native).unwrap();
        let old = OldValue::new(10i32.to_ne_bytes().to_vec());
        let user = UserValue::scalar::<i32>(5);
        let current = 15i32.to_ne_bytes();
        let mut out = flags();
        assert_eq!(routine(&current, Some(&old), Some(&user), &mut out), 4);
    }

    #[test]
    fn any_integer_tries_widest_width_first() {
        let routine = build_routine(ScanDataType::AnyInteger, ScanMatchType::Any, Endianness::Native).unwrap();
        let buf = [1u8; 8];
        let mut out = flags();
        assert_eq!(routine(&buf, None, None, &mut out), 8);
        assert!(out.contains(MatchFlags::U64) || out.contains(MatchFlags::S64));
    }

    #[test]
    fn byte_array_any_matches_whole_span() {
        let routine = build_routine(ScanDataType::ByteArray, ScanMatchType::Any, Endianness::Native).unwrap();
        let buf = [1, 2, 3, 4];
        let mut out = flags();
        assert_eq!(routine(&buf, None, None, &mut out), 4);
    }

    #[test]
    fn byte_array_equal_to_is_masked_prefix_compare() {
        let routine = build_routine(ScanDataType::ByteArray, ScanMatchType::EqualTo, Endianness::Native).unwrap();
        let user = UserValue::byte_pattern(vec![0xAB, 0x00], Some(vec![0xFF, 0x00]));
        let buf = [0xAB, 0xFF, 0x99];
        let mut out = flags();
        assert_eq!(routine(&buf, None, Some(&user), &mut out), 2);
    }

    #[test]
    fn regex_requires_string_data_type() {
        let err = build_routine(ScanDataType::I32, ScanMatchType::Regex, Endianness::Native).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[test]
    fn regex_finds_pattern_in_buffer() {
        let routine = build_routine(ScanDataType::String, ScanMatchType::Regex, Endianness::Native).unwrap();
        let user = UserValue::string("wor.d");
        let buf = b"hello world";
        let mut out = flags();
        assert_eq!(routine(buf, None, Some(&user), &mut out), 5);
    }
}
