//! Offset/limit pagination and the list envelope
//!
//! List endpoints accept `_start` and `_limit` query parameters and answer
//! with a [`PageEnvelope`]:
//!
//! ```json
//! {
//!   "count": 12,
//!   "next": "http://localhost:1337/posts?_start=10&_limit=5",
//!   "previous": "http://localhost:1337/posts?_start=0&_limit=5",
//!   "data": [ ... ]
//! }
//! ```
//!
//! `previous` is only produced once `start >= limit`. The rule compares the
//! offset against the page *width*, so a client that shrinks `_limit`
//! between requests can get a `previous` link pointing to a window that
//! does not line up with the pages it has seen.

use crate::core::entity::Filter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page size used when `_limit` is absent or unusable
pub const DEFAULT_LIMIT: usize = 5;

/// Offset used when `_start` is absent or unusable
pub const DEFAULT_START: usize = 0;

/// Offset/size slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub start: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Create a window, forcing `limit >= 1`
    pub fn new(start: usize, limit: usize) -> Self {
        Self {
            start,
            limit: limit.max(1),
        }
    }

    /// Offset of the following window
    pub fn next_start(&self) -> usize {
        self.start.saturating_add(self.limit)
    }

    /// Offset of the preceding window, if one exists
    pub fn previous_start(&self) -> Option<usize> {
        if self.start < self.limit {
            None
        } else {
            Some(self.start - self.limit)
        }
    }

    /// Slice an in-memory sequence with this window
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.start)
            .take(self.limit)
            .collect()
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_START, DEFAULT_LIMIT)
    }
}

/// Parse the leading integer of `raw` the way a permissive `parseInt` would
///
/// Leading whitespace and one sign are accepted, trailing garbage is ignored.
/// Returns `None` when no digit is found.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));

    Some(if negative { -magnitude } else { magnitude })
}

/// Parameters of a list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParams {
    pub window: PageWindow,

    /// Full-text query (`_q`), `None` when absent or empty
    pub query: Option<String>,

    /// Exact-match filters (every parameter not starting with `_`)
    pub filter: Filter,
}

impl PageParams {
    /// Read `_start`, `_limit`, `_q` and filters from raw query parameters
    ///
    /// Unusable numbers fall back to their defaults instead of failing:
    /// a zero, negative or non-numeric `_limit` becomes `default_limit`,
    /// a non-numeric `_start` becomes 0 and a negative one clamps to 0.
    pub fn from_query(raw: &HashMap<String, String>, default_limit: usize) -> Self {
        let limit = raw
            .get("_limit")
            .and_then(|v| parse_leading_int(v))
            .filter(|v| *v > 0)
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
            .unwrap_or(default_limit);

        let start = raw
            .get("_start")
            .and_then(|v| parse_leading_int(v))
            .map(|v| usize::try_from(v.max(0)).unwrap_or(usize::MAX))
            .unwrap_or(DEFAULT_START);

        let query = raw
            .get("_q")
            .filter(|q| !q.trim().is_empty())
            .cloned();

        let filter = raw
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            window: PageWindow::new(start, limit),
            query,
            filter,
        }
    }
}

/// Navigation links for a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// `{count, next, previous, data}` response of list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    /// Total number of matching records in the store
    pub count: usize,

    /// Link to the following window, null on the last page
    pub next: Option<String>,

    /// Link to the preceding window, null while `start < limit`
    pub previous: Option<String>,

    pub data: Vec<T>,
}

/// Builds navigation links for one resource
#[derive(Debug, Clone)]
pub struct Paginator {
    base_url: String,
    resource: String,
}

impl Paginator {
    /// `base_url` is the public origin (`http://localhost:1337`),
    /// `resource` the plural route segment (`posts`)
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let resource = resource.into().trim_matches('/').to_string();
        Self { base_url, resource }
    }

    /// URL of the window starting at `start`
    pub fn page_url(&self, start: usize, limit: usize) -> String {
        format!(
            "{}/{}?_start={}&_limit={}",
            self.base_url, self.resource, start, limit
        )
    }

    /// Compute `next`/`previous` for `window` over `total` records
    pub fn links(&self, window: PageWindow, total: usize) -> PageLinks {
        let next_start = window.next_start();
        let next = if total <= next_start {
            None
        } else {
            Some(self.page_url(next_start, window.limit))
        };
        let previous = window
            .previous_start()
            .map(|start| self.page_url(start, window.limit));

        PageLinks { next, previous }
    }

    /// Wrap already-sanitized records in the list envelope
    pub fn envelope<T>(&self, window: PageWindow, total: usize, data: Vec<T>) -> PageEnvelope<T> {
        let PageLinks { next, previous } = self.links(window, total);
        PageEnvelope {
            count: total,
            next,
            previous,
            data,
        }
    }
}
