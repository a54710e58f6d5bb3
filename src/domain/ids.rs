//! Opaque identifiers and clock primitives shared across every component.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

newtype_id!(AgentId);
newtype_id!(TaskId);
newtype_id!(ProposalId);
newtype_id!(SessionId);
newtype_id!(PartitionId);
newtype_id!(SubscriptionId);

/// A point on the monotonic clock, immune to wall-clock adjustment.
///
/// Used for interval and deadline arithmetic (heartbeats, election timers,
/// timeouts) where NTP corrections or manual clock changes must never
/// perturb ordering.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.0.elapsed()
    }

    #[must_use]
    pub fn duration_since(&self, earlier: Self) -> std::time::Duration {
        self.0.duration_since(earlier.0)
    }
}

/// Logical clock providing both monotonic and wall-clock readings.
///
/// Monotonic readings back interval math (health checks, election timers);
/// wall-clock readings stamp records and wire payloads that need to survive
/// process restarts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogicalClock;

impl LogicalClock {
    #[must_use]
    pub fn now_monotonic() -> MonotonicInstant {
        MonotonicInstant(Instant::now())
    }

    #[must_use]
    pub fn now_wall() -> DateTime<Utc> {
        Utc::now()
    }
}

/// Monotonic counter shared by the event bus and by topology/consensus
/// version counters. Each call to `next` hands out a unique, increasing
/// value; `current` peeks without advancing.
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> SequenceNumber {
        SequenceNumber(self.0.fetch_add(1, Ordering::SeqCst))
    }

    #[must_use]
    pub fn current(&self) -> SequenceNumber {
        SequenceNumber(self.0.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counter_monotonic() {
        let counter = SequenceCounter::new();
        let a = counter.next();
        let b = counter.next();
        assert!(b.0 > a.0);
        assert_eq!(counter.current().0, b.0 + 1);
    }

    #[test]
    fn id_round_trips_through_display_and_parse() {
        let id = AgentId::new();
        let s = id.to_string();
        let parsed: AgentId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_are_unique() {
        assert_ne!(AgentId::new(), AgentId::new());
        assert_ne!(TaskId::new(), TaskId::new());
    }
}
