//! Hybrid logical cluster timestamps.
//!
//! The control plane orders metadata mutations with a `(seconds,
//! increment)` timestamp: wall-clock seconds plus a logical counter that
//! disambiguates events within the same second. The planner only consumes
//! these (from the cluster-time oracle); it never advances them itself.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A cluster timestamp: wall-clock seconds plus a logical increment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub secs: u64,
    /// Logical counter within the second.
    pub inc: u32,
}

impl Timestamp {
    /// Creates a timestamp from its components.
    pub const fn new(secs: u64, inc: u32) -> Self {
        Self { secs, inc }
    }

    /// The current wall-clock time with a zero increment.
    ///
    /// Convenience for clock-oracle implementations; a real deployment
    /// derives timestamps from the cluster's logical clock instead.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs();
        Self { secs, inc: 0 }
    }

    /// The next logical timestamp within the same second.
    pub const fn next_inc(&self) -> Self {
        Self {
            secs: self.secs,
            inc: self.inc.saturating_add(1),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.secs, self.inc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_secs_then_inc() {
        assert!(Timestamp::new(10, 5) < Timestamp::new(11, 0));
        assert!(Timestamp::new(10, 5) < Timestamp::new(10, 6));
        assert_eq!(Timestamp::new(10, 5), Timestamp::new(10, 5));
    }

    #[test]
    fn next_inc_is_monotonic() {
        let ts = Timestamp::new(42, 7);
        assert!(ts < ts.next_inc());
        assert_eq!(ts.next_inc(), Timestamp::new(42, 8));
    }

    #[test]
    fn now_is_after_2024() {
        assert!(Timestamp::now().secs > 1_704_067_200);
    }
}
