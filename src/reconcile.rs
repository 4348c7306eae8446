use crate::record::{RecordSet, DOI_COLUMN, UNKNOWN};
use std::collections::BTreeSet;

/// Path prefix the Scopus abstract-retrieval API expects in front of a DOI.
pub const DOI_PREFIX: &str = "doi/";

/// Case-folded DOI set of a record set, with sentinel entries excluded.
///
/// Records whose DOI is the sentinel have no resolvable identifier and cannot
/// participate in identifier-based reconciliation; they contribute nothing.
/// An absent DOI column yields the empty set.
pub fn doi_set(records: &RecordSet) -> BTreeSet<String> {
    match records.column_values(DOI_COLUMN) {
        Some(values) => values
            .filter(|doi| *doi != UNKNOWN)
            .map(|doi| doi.to_lowercase())
            .collect(),
        None => BTreeSet::new(),
    }
}

/// DOIs known to the candidate set but absent from the baseline, prefixed for
/// the Scopus lookup.
///
/// Pure function of its two inputs. Both sides are compared case-folded, the
/// result is deduplicated by construction and sorted lexicographically so
/// that output files are reproducible across reruns.
pub fn missing_dois(candidate: &RecordSet, baseline_dois: &BTreeSet<String>) -> Vec<String> {
    doi_set(candidate)
        .difference(baseline_dois)
        .map(|doi| format!("{DOI_PREFIX}{doi}"))
        .collect()
}
