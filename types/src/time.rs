//! Timestamps, share lifetimes and the clock seam.
//!
//! Timestamps are Unix epoch seconds (UTC). Share expiry is evaluated lazily
//! against the clock at read time; nothing sweeps expired records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A clock set before the epoch reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted `secs` into the future, saturating.
    pub fn plus_secs(&self, secs: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
///
/// The engine never reads the system clock directly so that tests can drive
/// expiry deterministically (see `sharecenter-nullables::NullClock`).
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Requested lifetime of a share, as supplied by a caller.
///
/// Negative second counts are representable so that they can be rejected
/// with `NONNEGATIVE_TIME` instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    /// The share never expires.
    Indefinite,
    /// The share expires this many seconds after it is granted.
    Seconds(i64),
}

impl Lifetime {
    /// Resolve to an absolute expiry relative to `now`.
    ///
    /// Returns `None` for a negative duration.
    pub fn expiry_from(&self, now: Timestamp) -> Option<Expiry> {
        match *self {
            Lifetime::Indefinite => Some(Expiry::Indefinite),
            Lifetime::Seconds(secs) if secs >= 0 => Some(Expiry::At(now.plus_secs(secs as u64))),
            Lifetime::Seconds(_) => None,
        }
    }
}

/// Absolute expiry of a share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expiry {
    Indefinite,
    At(Timestamp),
}

impl Expiry {
    /// A share is expired from the second its expiry is reached.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self {
            Expiry::Indefinite => false,
            Expiry::At(at) => now >= *at,
        }
    }

    /// Seconds left before expiry, `None` if indefinite.
    pub fn remaining(&self, now: Timestamp) -> Option<u64> {
        match self {
            Expiry::Indefinite => None,
            Expiry::At(at) => Some(at.as_secs().saturating_sub(now.as_secs())),
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Indefinite => write!(f, "indefinite"),
            Expiry::At(at) => write!(f, "at {}", at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_lifetime_has_no_expiry() {
        assert_eq!(Lifetime::Seconds(-1).expiry_from(Timestamp::new(10)), None);
    }

    #[test]
    fn one_second_lifetime_expires_after_one_second() {
        let created = Timestamp::new(1_000);
        let expiry = Lifetime::Seconds(1).expiry_from(created).unwrap();
        assert!(!expiry.is_expired(created));
        assert!(expiry.is_expired(Timestamp::new(1_001)));
        assert!(expiry.is_expired(Timestamp::new(5_000)));
    }

    #[test]
    fn zero_lifetime_is_expired_immediately() {
        let now = Timestamp::new(42);
        let expiry = Lifetime::Seconds(0).expiry_from(now).unwrap();
        assert!(expiry.is_expired(now));
    }

    #[test]
    fn indefinite_never_expires() {
        let expiry = Lifetime::Indefinite.expiry_from(Timestamp::EPOCH).unwrap();
        assert!(!expiry.is_expired(Timestamp::new(u64::MAX)));
        assert_eq!(expiry.remaining(Timestamp::new(5)), None);
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let expiry = Expiry::At(Timestamp::new(100));
        assert_eq!(expiry.remaining(Timestamp::new(40)), Some(60));
        assert_eq!(expiry.remaining(Timestamp::new(140)), Some(0));
    }

    #[test]
    fn huge_lifetime_saturates() {
        let expiry = Lifetime::Seconds(i64::MAX)
            .expiry_from(Timestamp::new(u64::MAX - 1))
            .unwrap();
        assert_eq!(expiry, Expiry::At(Timestamp::new(u64::MAX)));
    }
}
