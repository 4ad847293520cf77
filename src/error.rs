use crate::deps::thiserror;

/// Errors surfaced by the core scanning engine.
///
/// The domain variants correspond one-to-one with the error kinds named in
/// the design: they are the only ones a caller should need to match on.
/// `IO`/`Parse` are lower-level escape hatches carried over from the
/// process/maps introspection layer underneath.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `/proc` entries missing, or the target process is dead or a zombie.
    #[error("target process is unavailable: {reason}")]
    TargetUnavailable { reason: String },

    /// Could not open `/proc/<pid>/mem` for the requested access mode.
    #[error("permission denied accessing pid {pid}: {reason}")]
    Permission { pid: u32, reason: String },

    /// `(data_type, match_type)` has no routine, or a predicate that
    /// requires a user value was invoked without one.
    #[error("invalid scan options: {reason}")]
    InvalidOptions { reason: String },

    /// The supplied `UserValue` does not carry the flags the active scan
    /// type needs, or a regex pattern failed to compile.
    #[error("invalid user value: {reason}")]
    InvalidUserValue { reason: String },

    /// A filter (narrowing) scan was attempted before any full scan
    /// recorded matches.
    #[error("no existing matches to filter")]
    NoExistingMatches,

    /// A remote write returned fewer bytes than were requested.
    #[error("partial write at {address:#x}: wrote {wrote} of {requested} bytes")]
    IOPartial {
        address:   u64,
        wrote:     usize,
        requested: usize,
    },

    /// A non-page-fault read error against `/proc/<pid>/mem`.
    #[error("read error at {address:#x}: {source}")]
    IORead {
        address: u64,
        #[source]
        source:  std::io::Error,
    },

    #[error("an io error occurred: {source}")]
    IO {
        #[from]
        source: std::io::Error,
        #[cfg(feature = "nightly")]
        backtrace: std::backtrace::Backtrace,
    },

    #[error("parsing {typename} from {value:?}, reason: {reason:}")]
    Parse {
        value:    String,
        typename: &'static str,
        reason:   String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
