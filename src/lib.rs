pub mod config;
pub mod reconcile;
pub mod record;
pub mod sources;
pub mod store;

use config::Config;
use record::{RecordSet, DOI_COLUMN};
use sources::{HalSource, ScopusSource, SourceError};
use std::path::{Path, PathBuf};
use store::{StoreError, BASELINE_EXT, REPORT_EXT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result of a consolidation run. All tabular data ends up in file artifacts;
/// callers only see the narrative and the two status flags.
#[derive(Debug)]
pub struct Outcome {
    /// Human-readable narrative of what was written where.
    pub message: String,
    /// Whether the Scopus database accepted the credentials (`true` as well
    /// when no lookup was needed).
    pub authenticated: bool,
    /// Whether the consolidated extraction differs from the baseline.
    pub updated: bool,
}

/// Orchestrates the reconciliation pipeline: load the baseline Scopus
/// extraction, fetch the HAL extraction, look up the DOIs HAL knows but the
/// baseline lacks, and persist the consolidated result with full provenance.
pub struct Consolidator {
    hal: Box<dyn HalSource>,
    scopus: Box<dyn ScopusSource>,
    config: Config,
}

impl Consolidator {
    pub fn new(hal: Box<dyn HalSource>, scopus: Box<dyn ScopusSource>, config: Config) -> Self {
        Self {
            hal,
            scopus,
            config,
        }
    }

    /// Complement the Scopus extraction of `institute` for `corpus_year` with
    /// publications whose DOIs are found in HAL.
    ///
    /// The baseline file must already exist under `<working_dir>/<year>/`;
    /// callers are expected to check before invoking. A missing or corrupt
    /// baseline is fatal and no remote call is made. A Scopus authentication
    /// failure is reported through the outcome flags, not an error: the HAL
    /// extraction and missing-DOI artifacts written before the lookup remain
    /// on disk as partial progress.
    pub async fn consolidate_scopus(
        &self,
        institute: &str,
        working_dir: &Path,
        corpus_year: &str,
        verbose: bool,
    ) -> Result<Outcome, PipelineError> {
        let files = &self.config.files;
        let year_dir = working_dir.join(corpus_year);

        // Already extracted DOIs from the Scopus baseline
        let baseline_path = store::artifact_path(&year_dir, &files.scopus, BASELINE_EXT);
        let baseline = store::load_baseline(&baseline_path)?;
        let baseline_dois = reconcile::doi_set(&baseline);
        tracing::debug!(
            rows = baseline.len(),
            dois = baseline_dois.len(),
            "baseline loaded"
        );

        // Fresh HAL extraction, persisted before any lookup so it survives an
        // authentication failure
        let hal_records = self
            .hal
            .fetch_records(&institute.to_lowercase(), corpus_year)
            .await?;
        let hal_records = hal_records.normalized();
        let hal_path = store::artifact_path(&year_dir, &files.hal, REPORT_EXT);
        store::write_report(&hal_path, &hal_records)?;
        let mut message = format!(
            "HAL extraction file saved as '{}.{REPORT_EXT}' in:\n{}",
            files.hal,
            year_dir.display()
        );

        // DOIs found in HAL but absent from the baseline
        let missing = reconcile::missing_dois(&hal_records, &baseline_dois);
        let missing_path = store::artifact_path(&year_dir, &files.missing_dois, REPORT_EXT);
        store::write_report(
            &missing_path,
            &RecordSet::single_column(DOI_COLUMN, missing.clone()),
        )?;
        message += &format!(
            "\n\nDOIs found in HAL but missing from the Scopus extraction saved as \
             '{}.{REPORT_EXT}' in:\n{}",
            files.missing_dois,
            year_dir.display()
        );
        tracing::info!(missing = missing.len(), "reconciliation complete");

        let consolidated_path = store::artifact_path(&year_dir, &files.consolidated, BASELINE_EXT);

        if missing.is_empty() {
            store::write_baseline(&consolidated_path, &baseline)?;
            message += &format!(
                "\n\nAll HAL DOIs are in the initial Scopus extraction.\n\
                 Scopus file unchanged but saved as '{}.{BASELINE_EXT}' in:\n{}",
                files.consolidated,
                year_dir.display()
            );
            return Ok(Outcome {
                message,
                authenticated: true,
                updated: false,
            });
        }

        // Authoritative lookup of the missing DOIs
        let lookup = self
            .scopus
            .fetch_by_dois(&missing, self.config.lookup_timeout(), verbose)
            .await?;
        if !lookup.authenticated {
            return Ok(Outcome {
                message: "Scopus authentication failed".to_string(),
                authenticated: false,
                updated: false,
            });
        }

        let added = lookup.records.normalized();
        let (consolidated, updated) = if added.is_empty() {
            (baseline.clone(), false)
        } else {
            (baseline.concat(&added), true)
        };

        store::write_baseline(&consolidated_path, &consolidated)?;
        if updated {
            message += &format!(
                "\n\nScopus extraction updated with complementary HAL DOIs, saved as \
                 '{}.{BASELINE_EXT}' in:\n{}",
                files.consolidated,
                year_dir.display()
            );
        } else {
            message += &format!(
                "\n\nScopus extraction unchanged but saved as '{}.{BASELINE_EXT}' in:\n{}",
                files.consolidated,
                year_dir.display()
            );
        }

        let added_path = store::artifact_path(&year_dir, &files.added_dois, REPORT_EXT);
        store::write_report(&added_path, &added)?;
        message += &format!(
            "\n\nComplementary HAL DOIs added to the Scopus extraction saved as \
             '{}.{REPORT_EXT}' in:\n{}",
            files.added_dois,
            year_dir.display()
        );

        let failed_path = store::artifact_path(&year_dir, &files.failed_dois, REPORT_EXT);
        store::write_report(&failed_path, &lookup.failed)?;
        message += &format!(
            "\n\nComplementary HAL DOIs not found in the Scopus database saved as \
             '{}.{REPORT_EXT}' in:\n{}",
            files.failed_dois,
            year_dir.display()
        );

        Ok(Outcome {
            message,
            authenticated: true,
            updated,
        })
    }
}

/// Path of the baseline extraction a run would load, for caller-side
/// existence checks before invoking the pipeline.
pub fn baseline_path(config: &Config, working_dir: &Path, corpus_year: &str) -> PathBuf {
    store::artifact_path(
        &working_dir.join(corpus_year),
        &config.files.scopus,
        BASELINE_EXT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{async_trait, ScopusLookup};
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    struct MockHal {
        dois: Vec<&'static str>,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HalSource for MockHal {
        async fn fetch_records(&self, _: &str, _: &str) -> Result<RecordSet, SourceError> {
            self.called.store(true, Ordering::SeqCst);
            let mut records = RecordSet::new(vec![DOI_COLUMN, "Title"]);
            for doi in &self.dois {
                records.push_row(vec![doi.to_string(), "A HAL paper".to_string()]);
            }
            Ok(records)
        }
    }

    struct MockScopus {
        rows: Vec<Vec<String>>,
        failed: Vec<Vec<String>>,
        authenticated: bool,
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl MockScopus {
        fn found(dois: &[&str]) -> Self {
            Self {
                rows: dois
                    .iter()
                    .map(|doi| vec!["Lovelace A.".to_string(), doi.to_string()])
                    .collect(),
                failed: Vec::new(),
                authenticated: true,
                requested: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn rejecting() -> Self {
            Self {
                rows: Vec::new(),
                failed: Vec::new(),
                authenticated: false,
                requested: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ScopusSource for MockScopus {
        async fn fetch_by_dois(
            &self,
            prefixed_dois: &[String],
            _: Duration,
            _: bool,
        ) -> Result<ScopusLookup, SourceError> {
            self.requested
                .lock()
                .unwrap()
                .extend(prefixed_dois.iter().cloned());

            let mut records = RecordSet::new(vec!["Authors", DOI_COLUMN]);
            for row in &self.rows {
                records.push_row(row.clone());
            }
            let mut failed = RecordSet::new(vec![DOI_COLUMN, "Reason"]);
            for row in &self.failed {
                failed.push_row(row.clone());
            }
            Ok(ScopusLookup {
                records,
                failed,
                authenticated: self.authenticated,
            })
        }
    }

    fn write_test_baseline(dir: &Path, dois: &[&str]) {
        let year_dir = dir.join("2023");
        fs::create_dir_all(&year_dir).unwrap();
        let mut content = String::from("DOI,Title\n");
        for doi in dois {
            content += &format!("{doi},A Scopus paper\n");
        }
        fs::write(year_dir.join("final_scopus.csv"), content).unwrap();
    }

    fn consolidator(hal: MockHal, scopus: MockScopus) -> Consolidator {
        Consolidator::new(Box::new(hal), Box::new(scopus), Config::default())
    }

    #[tokio::test]
    async fn all_hal_dois_already_present_skips_the_lookup() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a", "10.1/b"]);

        let scopus = MockScopus::found(&[]);
        let requested = Arc::clone(&scopus.requested);
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a", "10.1/b"],
                called: Arc::new(AtomicBool::new(false)),
            },
            scopus,
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(outcome.authenticated);
        assert!(!outcome.updated);
        assert!(outcome.message.contains("All HAL DOIs"));
        // The authoritative lookup was never attempted
        assert!(requested.lock().unwrap().is_empty());

        // The unchanged baseline was still persisted
        let consolidated = dir.path().join("2023").join("final_scopus_hal.csv");
        let baseline = dir.path().join("2023").join("final_scopus.csv");
        assert_eq!(
            fs::read_to_string(consolidated).unwrap(),
            fs::read_to_string(baseline).unwrap()
        );
        // Missing-DOI report holds only the header
        let missing = fs::read_to_string(dir.path().join("2023").join("hal_new_dois.tsv")).unwrap();
        assert_eq!(missing, "DOI\n");
    }

    #[tokio::test]
    async fn new_hal_doi_is_fetched_and_appended() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a"]);

        let scopus = MockScopus::found(&["10.1/c"]);
        let requested = Arc::clone(&scopus.requested);
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a", "10.1/c"],
                called: Arc::new(AtomicBool::new(false)),
            },
            scopus,
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(outcome.authenticated);
        assert!(outcome.updated);
        assert_eq!(*requested.lock().unwrap(), vec!["doi/10.1/c"]);

        let consolidated =
            store::load_baseline(&dir.path().join("2023").join("final_scopus_hal.csv")).unwrap();
        assert_eq!(consolidated.len(), 2);
        // Baseline row first, appended lookup row last
        let dois: Vec<_> = consolidated.column_values(DOI_COLUMN).unwrap().collect();
        assert_eq!(dois, vec!["10.1/a", "10.1/c"]);

        // Added report has exactly the one resolved record
        let added = fs::read_to_string(dir.path().join("2023").join("hal_added_dois.tsv")).unwrap();
        assert_eq!(added.lines().count(), 2);
    }

    #[tokio::test]
    async fn authentication_failure_suppresses_consolidated_write() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a"]);

        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a", "10.1/c"],
                called: Arc::new(AtomicBool::new(false)),
            },
            MockScopus::rejecting(),
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(!outcome.authenticated);
        assert_eq!(outcome.message, "Scopus authentication failed");
        assert!(!dir.path().join("2023").join("final_scopus_hal.csv").exists());
        assert!(!dir.path().join("2023").join("hal_added_dois.tsv").exists());

        // Artifacts written before the lookup survive as partial progress
        assert!(dir.path().join("2023").join("hal_extraction.tsv").exists());
        let missing = fs::read_to_string(dir.path().join("2023").join("hal_new_dois.tsv")).unwrap();
        assert_eq!(missing, "DOI\ndoi/10.1/c\n");
    }

    #[tokio::test]
    async fn sentinel_doi_in_hal_extraction_is_ignored() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a"]);

        // "NA" normalizes to the sentinel and must not reach the lookup
        let scopus = MockScopus::found(&[]);
        let requested = Arc::clone(&scopus.requested);
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a", "NA"],
                called: Arc::new(AtomicBool::new(false)),
            },
            scopus,
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(outcome.authenticated);
        assert!(!outcome.updated);
        assert!(requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn doi_comparison_ignores_case() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/ABC"]);

        let scopus = MockScopus::found(&[]);
        let requested = Arc::clone(&scopus.requested);
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/abc"],
                called: Arc::new(AtomicBool::new(false)),
            },
            scopus,
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(!outcome.updated);
        assert!(requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_baseline_fails_before_any_remote_call() {
        let dir = tempdir().unwrap();

        let hal_called = Arc::new(AtomicBool::new(false));
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a"],
                called: Arc::clone(&hal_called),
            },
            MockScopus::found(&[]),
        );

        let err = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Store(StoreError::BaselineMissing(_))
        ));
        assert!(!hal_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rerun_with_unchanged_sources_is_idempotent() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a", "10.1/b"]);

        for _ in 0..2 {
            let runner = consolidator(
                MockHal {
                    dois: vec!["10.1/a", "10.1/b"],
                    called: Arc::new(AtomicBool::new(false)),
                },
                MockScopus::found(&[]),
            );
            let outcome = runner
                .consolidate_scopus("Liten", dir.path(), "2023", false)
                .await
                .unwrap();
            assert!(!outcome.updated);
        }

        let consolidated =
            fs::read_to_string(dir.path().join("2023").join("final_scopus_hal.csv")).unwrap();
        let baseline =
            fs::read_to_string(dir.path().join("2023").join("final_scopus.csv")).unwrap();
        assert_eq!(consolidated, baseline);
    }

    #[tokio::test]
    async fn empty_lookup_result_still_writes_unchanged_baseline() {
        let dir = tempdir().unwrap();
        write_test_baseline(dir.path(), &["10.1/a"]);

        // Auth succeeds but every DOI fails to resolve
        let mut scopus = MockScopus::found(&[]);
        scopus.failed = vec![vec!["10.1/c".to_string(), "not found in Scopus".to_string()]];
        let runner = consolidator(
            MockHal {
                dois: vec!["10.1/a", "10.1/c"],
                called: Arc::new(AtomicBool::new(false)),
            },
            scopus,
        );

        let outcome = runner
            .consolidate_scopus("Liten", dir.path(), "2023", false)
            .await
            .unwrap();

        assert!(outcome.authenticated);
        assert!(!outcome.updated);
        assert!(outcome.message.contains("unchanged"));

        let consolidated =
            store::load_baseline(&dir.path().join("2023").join("final_scopus_hal.csv")).unwrap();
        assert_eq!(consolidated.len(), 1);

        let failed =
            fs::read_to_string(dir.path().join("2023").join("scopus_failed_dois.tsv")).unwrap();
        assert_eq!(failed, "DOI\tReason\n10.1/c\tnot found in Scopus\n");
    }
}
