//! Call-site registry
//!
//! Every distinct instrumentation call site registers itself once and gets a
//! dense, zero-based [`SiteId`] back. The id doubles as the position of the
//! site's metadata in the registry, so the report path joins records to names
//! with a plain indexed lookup. The registry never deduplicates by value:
//! "once per call site" is the caller's one-time-init guard (see the
//! `interval!` macro), and a bypassed guard merely wastes an id slot.
//!
//! Metadata strings are stored inline in fixed-capacity [`BoundedStr`] fields;
//! oversized names and file paths are truncated, never rejected, so a site
//! registration cannot fail.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Inline size of site name and file fields, in bytes. One byte is the
/// terminator, so at most 31 content bytes survive.
pub const META_CAPACITY: usize = 32;

/// Fixed-capacity inline string with a truncation contract.
///
/// Backed by an `N`-byte field whose last stored byte is always a zero
/// terminator, so at most `N - 1` bytes of UTF-8 content are kept.
/// Construction truncates to the longest prefix that fits and ends on a
/// `char` boundary; `as_str` is always valid UTF-8 and never reads past the
/// bound.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundedStr<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> BoundedStr<N> {
    /// Copy in `s`, truncating to the longest fitting prefix.
    pub fn truncated(s: &str) -> Self {
        let mut end = s.len().min(N.saturating_sub(1));
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut buf = [0u8; N];
        buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        // buf[end] is already 0: the terminator the capacity accounts for.
        Self { buf, len: end }
    }

    /// The stored text.
    pub fn as_str(&self) -> &str {
        // SAFETY: `truncated` only ever copies a char-boundary-aligned prefix
        // of a valid `&str`, so the stored bytes are valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.buf[..self.len]) }
    }

    /// Stored length in bytes (after truncation).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the stored text is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> fmt::Display for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// Dense, zero-based call-site identifier.
///
/// Ids are handed out in registration order and index directly into the
/// registry's metadata sequence (position == value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(u32);

impl SiteId {
    /// Reconstruct an id from its raw value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Position of this site's metadata in the registry.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable metadata for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteMeta {
    /// Display name of the instrumented region.
    pub name: BoundedStr<META_CAPACITY>,
    /// Source file of the call site.
    pub file: BoundedStr<META_CAPACITY>,
    /// Source line of the call site.
    pub line: u32,
}

/// Append-only table of site metadata, keyed by [`SiteId`].
pub struct SiteRegistry {
    sites: Mutex<Vec<SiteMeta>>,
}

impl SiteRegistry {
    /// Create a registry with room for `capacity` sites before reallocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sites: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append a new site and hand out the next sequential id.
    ///
    /// Oversized `name`/`file` values are truncated to the
    /// [`META_CAPACITY`]-byte fields (31 content bytes plus terminator).
    /// Append and id handout happen under one lock, so concurrent
    /// registrations always produce the dense sequence `0..len` with no
    /// gaps or duplicates.
    pub fn register(&self, name: &str, file: &str, line: u32) -> SiteId {
        let mut sites = self.lock();
        let id = SiteId(sites.len() as u32);
        sites.push(SiteMeta {
            name: BoundedStr::truncated(name),
            file: BoundedStr::truncated(file),
            line,
        });
        id
    }

    /// Look up a site's metadata.
    ///
    /// Returns `None` for ids this registry never handed out.
    pub fn get(&self, id: SiteId) -> Option<SiteMeta> {
        self.lock().get(id.index()).copied()
    }

    /// Number of registered sites.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no site has registered yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SiteMeta>> {
        self.sites.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
