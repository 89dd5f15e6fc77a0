//! Instrumentation macros
//!
//! The macro surface mirrors how instrumented code actually reads: declare a
//! named interval where timing starts, close it where timing ends, optionally
//! re-arm it inside a loop.
//!
//! ```no_run
//! use lapwatch::{interval, interval_end, interval_start};
//!
//! lapwatch::global::init();
//!
//! interval!(total);
//! for _ in 0..3 {
//!     interval_start!(total); // re-arm for this iteration
//!     // ... work ...
//!     interval_end!(total);
//! }
//! lapwatch::global::report().unwrap();
//! ```
//!
//! `interval!` registers the call site exactly once for the process lifetime
//! (a per-site `OnceLock<SiteId>`), then on every execution opens a fresh
//! record, tags it, and stamps its start. The record handle is bound to the
//! given identifier so `interval_end!`/`interval_start!` can reach it in the
//! same scope. Requires [`crate::global::init`] to have run.

/// Declare a named interval at this call site and start timing it.
///
/// Binds the record handle to `$name`; use [`interval_end!`] with the same
/// identifier to close it.
#[macro_export]
macro_rules! interval {
    ($name:ident) => {
        let $name = {
            static SITE: ::std::sync::OnceLock<$crate::site::SiteId> =
                ::std::sync::OnceLock::new();
            let recorder = $crate::global::recorder();
            let site = *SITE
                .get_or_init(|| recorder.register_site(stringify!($name), file!(), line!()));
            let record = recorder.open();
            record.tag(site);
            record.mark_start(recorder.now());
            record
        };
    };
}

/// Stamp the stop time of an interval declared with [`interval!`].
#[macro_export]
macro_rules! interval_end {
    ($name:ident) => {
        $name.mark_stop($crate::global::recorder().now());
    };
}

/// Re-arm the start time of an interval declared with [`interval!`], for
/// reuse across loop iterations without re-registering the site.
#[macro_export]
macro_rules! interval_start {
    ($name:ident) => {
        $name.mark_start($crate::global::recorder().now());
    };
}
