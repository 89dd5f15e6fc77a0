//! End-of-run report
//!
//! Walks the record store in append order, joins each record with its site
//! metadata, and writes one line per record:
//!
//! ```text
//! <name> @ (<file>:<line>) <microseconds> us
//! ```
//!
//! The report is read-only and idempotent. Two policies harden it against
//! partial data:
//!
//! - a record whose site id is not in the registry gets a placeholder line
//!   instead of aborting the whole report;
//! - a record that was never properly closed (missing stop, or a re-armed
//!   start with no matching stop) is printed with `incomplete` in place of a
//!   duration, never with a garbage number. Blank records (allocated but
//!   never tagged) are skipped and counted.

use std::io::{self, Write};

use thiserror::Error;

use crate::record::RecordState;
use crate::recorder::Recorder;

/// Errors from report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The output writer failed.
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Counters describing one report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Lines written (closed, incomplete, and placeholder lines).
    pub written: usize,
    /// Records without a usable duration (open, re-armed, or blank).
    pub incomplete: usize,
    /// Records whose site id had no registry entry.
    pub unknown_sites: usize,
}

impl Recorder {
    /// Write the report to `out`, one line per record in append order.
    pub fn report_to<W: Write>(&self, out: &mut W) -> Result<ReportSummary, ReportError> {
        let mut summary = ReportSummary::default();
        self.intervals().try_for_each(|record| {
            match record.state() {
                RecordState::Closed { site, duration_ns } => {
                    let us = duration_ns as f64 / 1_000.0;
                    match self.sites().get(site) {
                        Some(meta) => {
                            writeln!(
                                out,
                                "{} @ ({}:{}) {:.3} us",
                                meta.name, meta.file, meta.line, us
                            )?;
                        }
                        None => {
                            summary.unknown_sites += 1;
                            writeln!(out, "<unknown site {}> @ (?:?) {:.3} us", site, us)?;
                        }
                    }
                    summary.written += 1;
                }
                RecordState::Incomplete { site } => {
                    summary.incomplete += 1;
                    match self.sites().get(site) {
                        Some(meta) => {
                            writeln!(
                                out,
                                "{} @ ({}:{}) incomplete",
                                meta.name, meta.file, meta.line
                            )?;
                        }
                        None => {
                            summary.unknown_sites += 1;
                            writeln!(out, "<unknown site {}> @ (?:?) incomplete", site)?;
                        }
                    }
                    summary.written += 1;
                }
                RecordState::Blank => {
                    // Opened but never tagged; nothing meaningful to print.
                    summary.incomplete += 1;
                }
            }
            Ok::<(), ReportError>(())
        })?;

        tracing::debug!(
            written = summary.written,
            incomplete = summary.incomplete,
            unknown_sites = summary.unknown_sites,
            "interval report complete"
        );
        Ok(summary)
    }

    /// Write the report to stdout.
    pub fn report(&self) -> Result<ReportSummary, ReportError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let summary = self.report_to(&mut out)?;
        out.flush()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderConfig;
    use crate::site::SiteId;

    fn recorder() -> Recorder {
        Recorder::new(RecorderConfig {
            chunk_capacity: 4,
            site_capacity: 4,
        })
    }

    fn render(recorder: &Recorder) -> (String, ReportSummary) {
        let mut out = Vec::new();
        let summary = recorder.report_to(&mut out).unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn test_empty_recorder_reports_nothing() {
        let recorder = recorder();
        let (text, summary) = render(&recorder);
        assert!(text.is_empty());
        assert_eq!(summary, ReportSummary::default());
    }

    #[test]
    fn test_single_closed_record_line_shape() {
        let recorder = recorder();
        let site = recorder.register_site("A", "main.rs", 10);
        let rec = recorder.open();
        rec.tag(site);
        rec.mark_start(0);
        rec.mark_stop(5_000_000);

        let (text, summary) = render(&recorder);
        assert_eq!(text, "A @ (main.rs:10) 5000.000 us\n");
        assert_eq!(summary.written, 1);
        assert_eq!(summary.incomplete, 0);
        assert_eq!(summary.unknown_sites, 0);
    }

    #[test]
    fn test_submicrosecond_resolution() {
        let recorder = recorder();
        let site = recorder.register_site("tiny", "t.rs", 1);
        let rec = recorder.open();
        rec.tag(site);
        rec.mark_start(100);
        rec.mark_stop(850);

        let (text, _) = render(&recorder);
        assert_eq!(text, "tiny @ (t.rs:1) 0.750 us\n");
    }

    #[test]
    fn test_report_order_is_append_order() {
        let recorder = recorder();
        let a = recorder.register_site("a", "x.rs", 1);
        let b = recorder.register_site("b", "x.rs", 2);
        // Close out of order; report order must still follow creation.
        let first = recorder.open();
        first.tag(a);
        first.mark_start(0);
        let second = recorder.open();
        second.tag(b);
        second.mark_start(10);
        second.mark_stop(20);
        first.mark_stop(100);

        let (text, _) = render(&recorder);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("a @ "));
        assert!(lines[1].starts_with("b @ "));
    }

    #[test]
    fn test_open_record_reported_incomplete() {
        let recorder = recorder();
        let site = recorder.register_site("stuck", "s.rs", 3);
        let rec = recorder.open();
        rec.tag(site);
        rec.mark_start(1_000);

        let (text, summary) = render(&recorder);
        assert_eq!(text, "stuck @ (s.rs:3) incomplete\n");
        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.written, 1);
    }

    #[test]
    fn test_blank_record_skipped_but_counted() {
        let recorder = recorder();
        recorder.open();

        let (text, summary) = render(&recorder);
        assert!(text.is_empty());
        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.written, 0);
    }

    #[test]
    fn test_unknown_site_gets_placeholder_and_report_continues() {
        let recorder = recorder();
        let known = recorder.register_site("known", "k.rs", 9);

        let bad = recorder.open();
        bad.tag(SiteId::from_raw(99));
        bad.mark_start(0);
        bad.mark_stop(1_000);

        let good = recorder.open();
        good.tag(known);
        good.mark_start(0);
        good.mark_stop(2_000);

        let (text, summary) = render(&recorder);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "<unknown site 99> @ (?:?) 1.000 us");
        assert_eq!(lines[1], "known @ (k.rs:9) 2.000 us");
        assert_eq!(summary.unknown_sites, 1);
        assert_eq!(summary.written, 2);
    }

    #[test]
    fn test_report_is_idempotent() {
        let recorder = recorder();
        let site = recorder.register_site("again", "r.rs", 5);
        for i in 0..10u64 {
            let rec = recorder.open();
            rec.tag(site);
            rec.mark_start(i * 100);
            rec.mark_stop(i * 100 + 50);
        }
        let (first, s1) = render(&recorder);
        let (second, s2) = render(&recorder);
        assert_eq!(first, second);
        assert_eq!(s1, s2);
    }
}
