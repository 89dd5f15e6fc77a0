//! Lapwatch - in-process interval timer for ad-hoc performance instrumentation
//!
//! Call sites mark the start and end of named code regions; at process exit
//! the host dumps every recorded interval with its elapsed duration. Records
//! live in a chunked append-only store that never relocates them, so a call
//! site can hold its record across millions of later appends (including from
//! other threads) and stamp it without a lock.
//!
//! # Quick start
//!
//! ```no_run
//! use lapwatch::{interval, interval_end};
//!
//! lapwatch::global::init();
//!
//! interval!(parse_input);
//! // ... work being timed ...
//! interval_end!(parse_input);
//!
//! // From the host's exit path:
//! lapwatch::global::report().unwrap();
//! ```
//!
//! For tests or embedded use, construct a [`Recorder`] directly instead of
//! installing the process-global one.

pub mod chunk_store;
pub mod global;
pub mod record;
pub mod recorder;
pub mod report;
pub mod site;

mod macros;

pub use chunk_store::ChunkStore;
pub use record::{IntervalRecord, RecordState};
pub use recorder::{Recorder, RecorderConfig};
pub use report::{ReportError, ReportSummary};
pub use site::{BoundedStr, SiteId, SiteMeta, SiteRegistry};
