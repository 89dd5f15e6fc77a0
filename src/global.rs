//! Process-global recorder installation
//!
//! The instrumentation macros need one recorder the whole process agrees on.
//! Installation is explicit: the host calls [`init`] (or [`init_with`]) once
//! at startup, before any instrumented code runs, and arranges for [`report`]
//! to run at exit or on a termination signal. The crate deliberately does not
//! register exit hooks or signal handlers itself; lifecycle wiring belongs to
//! the host application.

use std::sync::OnceLock;

use crate::recorder::{Recorder, RecorderConfig};
use crate::report::{ReportError, ReportSummary};

static RECORDER: OnceLock<Recorder> = OnceLock::new();

/// Install the process recorder with default sizing. Idempotent; the first
/// call wins and later calls return the already-installed recorder.
pub fn init() -> &'static Recorder {
    init_with(RecorderConfig::default())
}

/// Install the process recorder with explicit sizing. Idempotent; `config`
/// is ignored if a recorder is already installed.
pub fn init_with(config: RecorderConfig) -> &'static Recorder {
    let mut installed = false;
    let recorder = RECORDER.get_or_init(|| {
        installed = true;
        Recorder::new(config)
    });
    if installed {
        tracing::debug!("process interval recorder installed");
    }
    recorder
}

/// The installed recorder, if [`init`] has run.
pub fn try_recorder() -> Option<&'static Recorder> {
    RECORDER.get()
}

/// The installed recorder.
///
/// # Panics
///
/// Panics if [`init`] has not been called. Instrumented code reaching this
/// point before initialization is a wiring bug in the host, not a condition
/// to limp through.
pub fn recorder() -> &'static Recorder {
    try_recorder().expect("lapwatch::global::init() must run before any instrumented code")
}

/// Report all recorded intervals to stdout.
///
/// The host calls this from its exit path (and from its signal handling
/// pathway, after which it may terminate the process).
///
/// # Panics
///
/// Panics if [`init`] has not been called.
pub fn report() -> Result<ReportSummary, ReportError> {
    recorder().report()
}
