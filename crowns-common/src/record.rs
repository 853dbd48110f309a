//! Record model
//!
//! A [`Record`] is one tracked monster with its two crown flags. A
//! [`Collection`] is the ordered list of records owned by one user, in
//! import order (which is also carousel order).
//!
//! Invariants upheld by every constructor in this crate:
//! - names are non-empty after trimming
//! - ids are unique within a collection
//! - toggling a flag never changes a record's id

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One of the two crown sizes tracked per monster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crown {
    Small,
    Large,
}

/// One tracked item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub small: bool,
    pub large: bool,
}

impl Record {
    /// Create a record whose id is derived from its name and ordinal
    pub fn new(name: impl Into<String>, ordinal: usize, small: bool, large: bool) -> Self {
        let name = name.into();
        Self {
            id: derive_id(&name, ordinal),
            name,
            small,
            large,
        }
    }

    pub fn crown(&self, crown: Crown) -> bool {
        match crown {
            Crown::Small => self.small,
            Crown::Large => self.large,
        }
    }

    /// Both crowns obtained
    pub fn is_complete(&self) -> bool {
        self.small && self.large
    }
}

/// Derive a record id from its name and its position in the import
///
/// The ordinal keeps ids distinct when the same name appears twice.
pub fn derive_id(name: &str, ordinal: usize) -> String {
    format!("{}__{}", name, ordinal)
}

/// Ordered records belonging to one user
///
/// Only serializable; reads go through [`Collection::from_records`] so the
/// invariants above always hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Collection {
    records: Vec<Record>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, dropping records that would break the invariants
    ///
    /// Records with blank names are skipped; a record whose id was already
    /// seen is skipped as well (first one wins).
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|r| !r.name.trim().is_empty())
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Flip one crown of the record with `id`
    ///
    /// Returns the new flag value, or `None` when no record has that id.
    pub fn toggle(&mut self, id: &str, crown: Crown) -> Option<bool> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        let flag = match crown {
            Crown::Small => &mut record.small,
            Crown::Large => &mut record.large,
        };
        *flag = !*flag;
        Some(*flag)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
