use super::{async_trait, ScopusLookup, ScopusSource, SourceError};
use crate::record::RecordSet;
use crate::reconcile::DOI_PREFIX;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const SCOPUS_API_BASE: &str = "https://api.elsevier.com/content/abstract";
const USER_AGENT: &str = "haltoscopus/0.1.0 (https://github.com/user/haltoscopus)";

/// Column set of records resolved from the Scopus database. Shared with the
/// baseline extraction so consolidated rows line up.
pub const SCOPUS_COLUMNS: &[&str] = &[
    "Authors",
    "Title",
    "Year",
    "Source title",
    "Document Type",
    "Cited by",
    "DOI",
];

/// Column set of the failed-DOI report.
pub const FAILED_COLUMNS: &[&str] = &["DOI", "Reason"];

/// Client for the Elsevier abstract-retrieval API.
pub struct ScopusClient {
    client: Client,
    api_key: String,
}

impl ScopusClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct AbstractResponse {
    #[serde(rename = "abstracts-retrieval-response")]
    body: RetrievalBody,
}

#[derive(Debug, Deserialize)]
struct RetrievalBody {
    coredata: CoreData,
    authors: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct CoreData {
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
    #[serde(rename = "citedby-count")]
    citedby_count: Option<String>,
    #[serde(rename = "subtypeDescription")]
    subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    author: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "ce:indexed-name")]
    indexed_name: Option<String>,
}

impl AbstractResponse {
    /// Flatten the retrieval response into a row, falling back to the
    /// requested DOI when the payload omits its own.
    fn to_row(&self, requested_doi: &str) -> Vec<String> {
        let coredata = &self.body.coredata;
        let authors = self
            .body
            .authors
            .as_ref()
            .map(|list| {
                list.author
                    .iter()
                    .filter_map(|a| a.indexed_name.clone())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let year = coredata
            .cover_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .unwrap_or_default()
            .to_string();

        vec![
            authors,
            coredata.title.clone().unwrap_or_default(),
            year,
            coredata.publication_name.clone().unwrap_or_default(),
            coredata.subtype.clone().unwrap_or_default(),
            coredata.citedby_count.clone().unwrap_or_default(),
            coredata
                .doi
                .clone()
                .unwrap_or_else(|| requested_doi.to_string()),
        ]
    }
}

#[async_trait]
impl ScopusSource for ScopusClient {
    async fn fetch_by_dois(
        &self,
        prefixed_dois: &[String],
        timeout: Duration,
        verbose: bool,
    ) -> Result<ScopusLookup, SourceError> {
        let mut records = RecordSet::new(SCOPUS_COLUMNS.to_vec());
        let mut failed = RecordSet::new(FAILED_COLUMNS.to_vec());

        let pb = if verbose {
            let pb = ProgressBar::new(prefixed_dois.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap()
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for prefixed in prefixed_dois {
            let doi = prefixed.strip_prefix(DOI_PREFIX).unwrap_or(prefixed.as_str());
            let url = format!("{SCOPUS_API_BASE}/{prefixed}");

            let response = self
                .client
                .get(&url)
                .header("X-ELS-APIKey", &self.api_key)
                .header("Accept", "application/json")
                .timeout(timeout)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(doi, error = %e, "Scopus request failed");
                    failed.push_row(vec![doi.to_string(), e.to_string()]);
                    pb.inc(1);
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                // The database rejected the credentials for the whole batch;
                // stop looking up further DOIs
                tracing::warn!(%status, "Scopus authentication failed");
                pb.finish_and_clear();
                return Ok(ScopusLookup {
                    records: RecordSet::new(SCOPUS_COLUMNS.to_vec()),
                    failed: RecordSet::new(FAILED_COLUMNS.to_vec()),
                    authenticated: false,
                });
            } else if status == StatusCode::NOT_FOUND {
                failed.push_row(vec![doi.to_string(), "not found in Scopus".to_string()]);
            } else if status.is_success() {
                match response.json::<AbstractResponse>().await {
                    Ok(parsed) => records.push_row(parsed.to_row(doi)),
                    Err(e) => {
                        failed.push_row(vec![doi.to_string(), format!("unparsable response: {e}")]);
                    }
                }
            } else {
                failed.push_row(vec![doi.to_string(), format!("HTTP status {status}")]);
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        tracing::debug!(
            resolved = records.len(),
            failed = failed.len(),
            "Scopus lookup finished"
        );
        Ok(ScopusLookup {
            records,
            failed,
            authenticated: true,
        })
    }
}
