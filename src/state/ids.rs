//! Session identity generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for one connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues process-wide unique session identifiers.
///
/// Values are strictly increasing and never reused while the process runs.
/// Constructed once at startup and passed by handle to the accept loop.
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next unique id. Safe under unbounded concurrent callers.
    pub fn next(&self) -> SessionId {
        SessionId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
