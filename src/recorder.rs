//! Recorder facade
//!
//! [`Recorder`] is the coordination point instrumented code talks to: it owns
//! the chunked record store, the site registry, and the monotonic epoch every
//! timestamp is measured against. It is an explicitly constructed context
//! object; process-global installation lives in [`crate::global`] and is
//! optional, so tests and embedded uses can run any number of independent
//! recorders side by side.

use std::time::Instant;

use crate::chunk_store::ChunkStore;
use crate::record::IntervalRecord;
use crate::site::{SiteId, SiteRegistry};

/// Historical default: one million records per chunk.
pub const DEFAULT_CHUNK_CAPACITY: usize = 1_048_576;

/// Historical default: registry room for a thousand sites before reallocation.
pub const DEFAULT_SITE_CAPACITY: usize = 1000;

/// Sizing knobs for a [`Recorder`].
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Records per storage chunk. Each chunk reserves this many slots up
    /// front, so large values trade memory for fewer allocations.
    pub chunk_capacity: usize,
    /// Site entries to reserve in the registry.
    pub site_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            site_capacity: DEFAULT_SITE_CAPACITY,
        }
    }
}

impl RecorderConfig {
    /// Config with a custom chunk capacity, registry sizing left at default.
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        Self {
            chunk_capacity,
            ..Self::default()
        }
    }
}

/// Interval recorder: record store + site registry + monotonic epoch.
pub struct Recorder {
    epoch: Instant,
    intervals: ChunkStore<IntervalRecord>,
    sites: SiteRegistry,
}

impl Recorder {
    /// Build a recorder. The epoch is captured here; every stamp taken via
    /// [`Recorder::now`] is relative to this instant.
    ///
    /// # Panics
    ///
    /// Panics if `config.chunk_capacity` is 0.
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            epoch: Instant::now(),
            intervals: ChunkStore::new(config.chunk_capacity),
            sites: SiteRegistry::with_capacity(config.site_capacity),
        }
    }

    /// Append a blank record and return its stable handle.
    ///
    /// The caller tags and stamps it immediately; the handle stays valid for
    /// the recorder's lifetime no matter how many records follow.
    pub fn open(&self) -> &IntervalRecord {
        self.intervals.append(IntervalRecord::blank())
    }

    /// Register a call site. Meant to run once per site via the caller's
    /// one-time-init guard; see the `interval!` macro.
    pub fn register_site(&self, name: &str, file: &str, line: u32) -> SiteId {
        let id = self.sites.register(name, file, line);
        tracing::trace!(site = %id, name, file, line, "registered interval site");
        id
    }

    /// Monotonic nanoseconds since the recorder epoch.
    pub fn now(&self) -> u64 {
        // u64 nanoseconds cover ~584 years of process uptime.
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Fractional seconds between two stamps taken from [`Recorder::now`].
    pub fn elapsed_secs(start_ns: u64, stop_ns: u64) -> f64 {
        (stop_ns as f64 - start_ns as f64) / 1e9
    }

    /// Fractional seconds since the recorder epoch.
    pub fn since_start(&self) -> f64 {
        self.now() as f64 / 1e9
    }

    /// Records appended so far (open and closed alike).
    pub fn record_count(&self) -> usize {
        self.intervals.len()
    }

    /// Positional access to a record, in append order.
    pub fn record(&self, index: usize) -> Option<&IntervalRecord> {
        self.intervals.get(index)
    }

    /// Call sites registered so far.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub(crate) fn intervals(&self) -> &ChunkStore<IntervalRecord> {
        &self.intervals
    }

    pub(crate) fn sites(&self) -> &SiteRegistry {
        &self.sites
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}
