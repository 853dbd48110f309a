//! Progress summaries, filtering and carousel navigation
//!
//! Every view (owner dashboard, owner carousel, public carousel) derives its
//! numbers and badges from the functions here. View state such as the
//! search text or the carousel index is always passed in by the caller.

use serde::Serialize;

use crate::record::{Collection, Record};

/// Collection-wide crown counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub small: usize,
    pub large: usize,
    pub both: usize,
}

/// Completion state of a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Complete,
    Partial,
    Missing,
}

impl Status {
    /// Badge text shown next to a record
    pub fn label(self) -> &'static str {
        match self {
            Status::Complete => "Completo",
            Status::Partial => "Parcial",
            Status::Missing => "Faltan",
        }
    }
}

pub fn summarize(collection: &Collection) -> Summary {
    collection.iter().fold(Summary::default(), |mut acc, r| {
        acc.total += 1;
        acc.small += usize::from(r.small);
        acc.large += usize::from(r.large);
        acc.both += usize::from(r.is_complete());
        acc
    })
}

pub fn status(record: &Record) -> Status {
    match (record.small, record.large) {
        (true, true) => Status::Complete,
        (false, false) => Status::Missing,
        _ => Status::Partial,
    }
}

/// Records whose name contains `query` (case-insensitive), optionally
/// hiding complete ones. Order is preserved.
pub fn filter<'a>(collection: &'a Collection, query: &str, only_missing: bool) -> Vec<&'a Record> {
    let query = query.trim().to_lowercase();
    collection
        .iter()
        .filter(|r| query.is_empty() || r.name.to_lowercase().contains(&query))
        .filter(|r| !only_missing || !r.is_complete())
        .collect()
}

/// Position within a collection for one-at-a-time browsing
///
/// Navigation wraps at both ends. An index outside the collection (e.g.
/// after the collection shrank) resets to the first record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Carousel {
    index: usize,
    len: usize,
}

impl Carousel {
    pub fn new(len: usize, index: usize) -> Self {
        let index = if index >= len { 0 } else { index };
        Self { index, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            (self.index + 1) % self.len
        }
    }

    pub fn prev(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            (self.index + self.len - 1) % self.len
        }
    }

    pub fn current<'a>(&self, collection: &'a Collection) -> Option<&'a Record> {
        collection.get(self.index)
    }
}

/// Complete records out of total, as shown on carousel headers
pub fn completion(collection: &Collection) -> (usize, usize) {
    let summary = summarize(collection);
    (summary.both, summary.total)
}
