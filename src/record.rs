//! Interval records
//!
//! An [`IntervalRecord`] is one timed execution of an instrumented region.
//! Records are created blank inside the chunk store, then tagged with their
//! site id and stamped with start/stop times by the call site that owns them.
//! All fields are atomics so stamping needs no lock: a record handle belongs
//! to a single logical call-site execution, and the report path reads whatever
//! is visible at shutdown.
//!
//! Lifecycle: `blank` (no site, no stamps) → `tagged` (site + start set) →
//! `closed` (stop set, `stop >= start`). Only closed records yield a duration;
//! everything else is classified [`RecordState::Incomplete`] so the report
//! never fabricates a duration from missing stamps.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::site::SiteId;

const UNSET_SITE: u32 = u32::MAX;
const UNSET_STAMP: u64 = u64::MAX;

/// One timed interval, owned by the chunk store.
///
/// Timestamps are monotonic nanoseconds relative to the owning recorder's
/// epoch ([`crate::recorder::Recorder::now`]).
#[derive(Debug)]
pub struct IntervalRecord {
    site: AtomicU32,
    start_ns: AtomicU64,
    stop_ns: AtomicU64,
}

/// What a record looks like at report time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Both stamps set with `stop >= start`.
    Closed { site: SiteId, duration_ns: u64 },
    /// Tagged but missing a stop (or re-armed and never re-closed).
    Incomplete { site: SiteId },
    /// Allocated but never tagged; the opening call site never got to it.
    Blank,
}

impl IntervalRecord {
    /// Create a blank record with all fields unset.
    pub fn blank() -> Self {
        Self {
            site: AtomicU32::new(UNSET_SITE),
            start_ns: AtomicU64::new(UNSET_STAMP),
            stop_ns: AtomicU64::new(UNSET_STAMP),
        }
    }

    /// Attach the call site's id. Done once per record in normal use.
    pub fn tag(&self, site: SiteId) {
        self.site.store(site.raw(), Ordering::Release);
    }

    /// Stamp (or re-arm) the start time.
    pub fn mark_start(&self, now_ns: u64) {
        self.start_ns.store(now_ns, Ordering::Release);
    }

    /// Stamp the stop time.
    pub fn mark_stop(&self, now_ns: u64) {
        self.stop_ns.store(now_ns, Ordering::Release);
    }

    /// Site id, if the record was tagged.
    pub fn site(&self) -> Option<SiteId> {
        match self.site.load(Ordering::Acquire) {
            UNSET_SITE => None,
            raw => Some(SiteId::from_raw(raw)),
        }
    }

    /// Start stamp in epoch nanoseconds, if set.
    pub fn start_ns(&self) -> Option<u64> {
        match self.start_ns.load(Ordering::Acquire) {
            UNSET_STAMP => None,
            ns => Some(ns),
        }
    }

    /// Stop stamp in epoch nanoseconds, if set.
    pub fn stop_ns(&self) -> Option<u64> {
        match self.stop_ns.load(Ordering::Acquire) {
            UNSET_STAMP => None,
            ns => Some(ns),
        }
    }

    /// Elapsed nanoseconds, only for properly closed records.
    ///
    /// Returns `None` when either stamp is missing or `stop < start` (a
    /// re-armed start whose stop was never re-stamped).
    pub fn duration_ns(&self) -> Option<u64> {
        let start = self.start_ns()?;
        let stop = self.stop_ns()?;
        stop.checked_sub(start)
    }

    /// Classify the record for reporting.
    pub fn state(&self) -> RecordState {
        match self.site() {
            None => RecordState::Blank,
            Some(site) => match self.duration_ns() {
                Some(duration_ns) => RecordState::Closed { site, duration_ns },
                None => RecordState::Incomplete { site },
            },
        }
    }
}

impl Default for IntervalRecord {
    fn default() -> Self {
        Self::blank()
    }
}
