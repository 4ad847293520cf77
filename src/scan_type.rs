//! The scan type taxonomy: which data type is being read at each location
//! and which predicate decides whether it matches.

use crate::deps::serde;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScanDataType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    ByteArray,
    String,
    AnyInteger,
    AnyFloat,
    AnyNumber,
}

impl ScanDataType {
    /// Number of bytes a routine for this type needs available at a
    /// location before it can even attempt a match. For the `Any*` family
    /// this is the widest candidate width, since old-value reconstruction
    /// must cover every width the routine might try.
    pub fn bytes_needed(self) -> usize {
        use ScanDataType::*;
        match self {
            I8 => 1,
            I16 => 2,
            I32 => 4,
            I64 => 8,
            F32 => 4,
            F64 => 8,
            ByteArray | String => 1,
            AnyInteger | AnyFloat | AnyNumber => 8,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ScanDataType::ByteArray | ScanDataType::String)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScanMatchType {
    // snapshot / delta family (no user value, or old-value only)
    Any,
    Update,
    NotChanged,
    Changed,
    Increased,
    Decreased,
    // with-user-value family
    EqualTo,
    NotEqualTo,
    GreaterThan,
    LessThan,
    Range,
    Regex,
    IncreasedBy,
    DecreasedBy,
}

impl ScanMatchType {
    /// Predicates that require a `UserValue` to have been supplied.
    pub fn needs_user_value(self) -> bool {
        use ScanMatchType::*;
        matches!(
            self,
            EqualTo | NotEqualTo | GreaterThan | LessThan | Range | Regex | IncreasedBy | DecreasedBy
        )
    }

    /// Predicates that consult the previously recorded `old_byte`s (either
    /// in place of, or alongside, a user value).
    pub fn uses_old_value(self) -> bool {
        use ScanMatchType::*;
        matches!(
            self,
            Update | NotChanged | Changed | Increased | Decreased | IncreasedBy | DecreasedBy
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_needed_matches_width() {
        assert_eq!(ScanDataType::I32.bytes_needed(), 4);
        assert_eq!(ScanDataType::F64.bytes_needed(), 8);
        assert_eq!(ScanDataType::ByteArray.bytes_needed(), 1);
        assert_eq!(ScanDataType::AnyNumber.bytes_needed(), 8);
    }

    #[test]
    fn update_is_distinct_from_not_changed_but_both_use_old_value() {
        assert_ne!(ScanMatchType::Update, ScanMatchType::NotChanged);
        assert!(ScanMatchType::Update.uses_old_value());
        assert!(ScanMatchType::NotChanged.uses_old_value());
    }

    #[test]
    fn capability_queries() {
        assert!(ScanMatchType::EqualTo.needs_user_value());
        assert!(!ScanMatchType::Any.needs_user_value());
        assert!(ScanMatchType::IncreasedBy.uses_old_value());
        assert!(!ScanMatchType::EqualTo.uses_old_value());
    }
}
