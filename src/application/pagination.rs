//! Offset pagination helpers shared by the store, the feed and the HTTP layer.

use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// A validated limit/offset window. Only constructible with a positive limit
/// and a non-negative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPage {
    limit: i64,
    offset: i64,
}

impl OffsetPage {
    /// Normalise caller-supplied bounds. Returns `None` when the window takes
    /// zero entries (`limit <= 0`); a negative offset is treated as zero.
    pub fn new(limit: i64, offset: i64) -> Option<Self> {
        if limit <= 0 {
            return None;
        }
        Some(Self {
            limit,
            offset: offset.max(0),
        })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// `limit` as a `usize`, saturating on narrow targets.
    pub fn limit_usize(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(usize::MAX)
    }

    pub fn offset_usize(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(usize::MAX)
    }

    /// Offset of the following page, or `None` when `returned` shows this page
    /// was the last one.
    pub fn next_offset(&self, returned: usize) -> Option<i64> {
        if returned < self.limit_usize() {
            None
        } else {
            Some(self.offset.saturating_add(self.limit))
        }
    }
}

/// `?limit=&offset=` query parameters. Unparseable values fall back to the
/// defaults, like absent ones.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    limit: Option<String>,
    offset: Option<String>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        parse_with_default(self.limit.as_deref(), DEFAULT_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        parse_with_default(self.offset.as_deref(), 0)
    }
}

fn parse_with_default(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .map(i64::from)
        .unwrap_or(default)
}
