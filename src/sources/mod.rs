pub use async_trait::async_trait;

pub mod hal;
pub mod scopus;

use crate::record::RecordSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Result of a batch Scopus lookup.
pub struct ScopusLookup {
    /// Records resolved from the database, one row per found DOI.
    pub records: RecordSet,
    /// DOIs that could not be resolved despite successful authentication.
    pub failed: RecordSet,
    /// Whether the database accepted the credentials for the batch. `false`
    /// rejects the whole batch, not individual DOIs.
    pub authenticated: bool,
}

/// Capability to fetch the open-repository extraction for one institute and
/// corpus year.
#[async_trait]
pub trait HalSource: Send + Sync {
    async fn fetch_records(
        &self,
        institute: &str,
        corpus_year: &str,
    ) -> Result<RecordSet, SourceError>;
}

/// Capability to look up authoritative records for a list of prefixed DOIs.
#[async_trait]
pub trait ScopusSource: Send + Sync {
    async fn fetch_by_dois(
        &self,
        prefixed_dois: &[String],
        timeout: Duration,
        verbose: bool,
    ) -> Result<ScopusLookup, SourceError>;
}
