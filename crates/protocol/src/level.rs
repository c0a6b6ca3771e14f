//! Level - The process-wide log-level filter
//!
//! Quill filters on tags, not levels, but a set of well-known level tags can
//! be attached to any call site and the process-wide level filter accepts a
//! record iff its tag set contains a level tag at or above the configured
//! level. `Fatal` does not terminate the process; it is only the highest
//! severity position.

/// Highest-severity level tag. Does not call `abort`; just treated as a level.
pub const LOG_FATAL: &str = "LOG_FATAL";
/// Error-severity level tag.
pub const LOG_ERROR: &str = "LOG_ERROR";
/// Warning-severity level tag.
pub const LOG_WARN: &str = "LOG_WARN";
/// Informational level tag.
pub const LOG_INFO: &str = "LOG_INFO";
/// Debug level tag.
pub const LOG_DEBUG: &str = "LOG_DEBUG";
/// Accept-everything tag; lets a record through even with no level tag set.
pub const LOG_ALL: &str = "LOG_ALL";

/// Level tags ordered from most to least severe
pub const LEVEL_TAGS: [&str; 6] = [LOG_FATAL, LOG_ERROR, LOG_WARN, LOG_INFO, LOG_DEBUG, LOG_ALL];

/// Process-wide logging level
///
/// Ordering: `Fatal < Error < Warn < Info < Debug < All`. A level accepts a
/// record iff the record's tag set contains any level tag at or above it.
/// `All` accepts every record, including records carrying no level tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Fatal = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    All = 5,
}

impl Level {
    /// Resolve a level tag to its `Level`; unknown tags resolve to `All`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            LOG_FATAL => Level::Fatal,
            LOG_ERROR => Level::Error,
            LOG_WARN => Level::Warn,
            LOG_INFO => Level::Info,
            LOG_DEBUG => Level::Debug,
            _ => Level::All,
        }
    }

    /// Reconstruct a `Level` from its `u8` repr (used for atomic storage)
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Level::Fatal,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::All,
        }
    }

    /// Does this level accept a record with the given tag set?
    ///
    /// One of six precomputed acceptance forms: `All` accepts everything,
    /// every other level scans the level tags at or above itself.
    #[inline]
    pub fn accepts(self, tags: &[&str]) -> bool {
        if self == Level::All {
            return true;
        }
        let cutoff = self as usize;
        tags.iter()
            .any(|tag| LEVEL_TAGS[..=cutoff].contains(tag))
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::All
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::All => "all",
        };
        write!(f, "{name}")
    }
}
