//! Merge-by-name reconciliation of imports
//!
//! Decoded rows drive membership and order of the result. The previous
//! collection only donates `id`, `small` and `large` to rows whose name it
//! already knows, so re-importing a list never resets progress.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::csv_codec::Candidate;
use crate::record::{derive_id, Collection, Record};

/// Counts describing what an import did to a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Records in the new collection
    pub total: usize,
    /// Records that kept progress from the previous collection
    pub matched: usize,
    /// Records not present before; `matched + added == total`
    pub added: usize,
    /// Previous records absent from the import
    pub dropped: usize,
}

/// Combine freshly decoded rows with the previous collection
pub fn reconcile(decoded: &[Candidate], existing: &Collection) -> (Collection, ImportReport) {
    // Last occurrence wins if the previous collection repeats a name
    let by_name: HashMap<&str, &Record> = existing.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut claimed_names: HashSet<&str> = HashSet::new();
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(decoded.len());
    let mut report = ImportReport::default();

    for (position, candidate) in decoded.iter().enumerate() {
        let name = candidate.name.as_str();
        let record = match by_name.get(name) {
            Some(prev) => {
                report.matched += 1;
                // Only the first row naming a known record inherits its id
                let id = if claimed_names.insert(name) && !used_ids.contains(&prev.id) {
                    prev.id.clone()
                } else {
                    unique_id(name, position, &used_ids)
                };
                Record {
                    id,
                    name: candidate.name.clone(),
                    small: prev.small,
                    large: prev.large,
                }
            }
            None => {
                report.added += 1;
                Record {
                    id: unique_id(name, position, &used_ids),
                    name: candidate.name.clone(),
                    small: candidate.small,
                    large: candidate.large,
                }
            }
        };

        used_ids.insert(record.id.clone());
        records.push(record);
    }

    report.total = records.len();
    report.dropped = existing
        .iter()
        .filter(|r| !claimed_names.contains(r.name.as_str()))
        .count();

    (Collection::from_records(records), report)
}

fn unique_id(name: &str, position: usize, used: &HashSet<String>) -> String {
    let mut id = derive_id(name, position);
    let mut bump = 1;
    while used.contains(&id) {
        id = format!("{}__{}", derive_id(name, position), bump);
        bump += 1;
    }
    id
}
