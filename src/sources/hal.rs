use super::{async_trait, HalSource, SourceError};
use crate::record::RecordSet;
use reqwest::Client;
use serde::Deserialize;

const HAL_API_BASE: &str = "https://api.archives-ouvertes.fr/search/";
const USER_AGENT: &str = "haltoscopus/0.1.0 (https://github.com/user/haltoscopus)";
const MAX_ROWS: u32 = 10000;

/// Column set of a HAL extraction.
pub const HAL_COLUMNS: &[&str] = &[
    "HAL id",
    "Title",
    "Authors",
    "Journal",
    "Document type",
    "Year",
    "DOI",
];

/// Client for the HAL open-archive search API.
pub struct HalClient {
    client: Client,
}

impl HalClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HalClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct HalResponse {
    response: HalResult,
}

#[derive(Debug, Deserialize)]
struct HalResult {
    #[serde(rename = "numFound")]
    num_found: u64,
    docs: Vec<HalDoc>,
}

#[derive(Debug, Deserialize)]
struct HalDoc {
    #[serde(rename = "halId_s")]
    hal_id: Option<String>,
    #[serde(rename = "title_s")]
    title: Option<Vec<String>>,
    #[serde(rename = "authFullName_s")]
    authors: Option<Vec<String>>,
    #[serde(rename = "journalTitle_s")]
    journal: Option<String>,
    #[serde(rename = "docType_s")]
    doc_type: Option<String>,
    #[serde(rename = "producedDateY_i")]
    year: Option<i32>,
    #[serde(rename = "doiId_s")]
    doi: Option<String>,
}

impl HalDoc {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.hal_id.clone().unwrap_or_default(),
            self.title
                .as_ref()
                .and_then(|t| t.first().cloned())
                .unwrap_or_default(),
            self.authors.as_deref().unwrap_or_default().join("; "),
            self.journal.clone().unwrap_or_default(),
            self.doc_type.clone().unwrap_or_default(),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.doi.clone().unwrap_or_default(),
        ]
    }
}

#[async_trait]
impl HalSource for HalClient {
    async fn fetch_records(
        &self,
        institute: &str,
        corpus_year: &str,
    ) -> Result<RecordSet, SourceError> {
        let url = format!(
            "{}?q=collCode_s:{}&fq=producedDateY_i:{}&fl=halId_s,title_s,authFullName_s,\
             journalTitle_s,docType_s,producedDateY_i,doiId_s&rows={}&wt=json",
            HAL_API_BASE,
            urlencoding::encode(institute),
            urlencoding::encode(corpus_year),
            MAX_ROWS,
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let response: HalResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        tracing::debug!(
            institute,
            corpus_year,
            num_found = response.response.num_found,
            "fetched HAL extraction"
        );

        let mut records = RecordSet::new(HAL_COLUMNS.to_vec());
        for doc in &response.response.docs {
            records.push_row(doc.to_row());
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_maps_to_row_in_column_order() {
        let doc: HalDoc = serde_json::from_str(
            r#"{
                "halId_s": "hal-01234567",
                "title_s": ["A Paper", "Un papier"],
                "authFullName_s": ["Ada Lovelace", "Charles Babbage"],
                "journalTitle_s": "Nature",
                "docType_s": "ART",
                "producedDateY_i": 2023,
                "doiId_s": "10.1/abc"
            }"#,
        )
        .unwrap();

        let row = doc.to_row();
        assert_eq!(row.len(), HAL_COLUMNS.len());
        assert_eq!(row[0], "hal-01234567");
        assert_eq!(row[1], "A Paper");
        assert_eq!(row[2], "Ada Lovelace; Charles Babbage");
        assert_eq!(row[6], "10.1/abc");
    }

    #[test]
    fn absent_fields_become_empty_values() {
        let doc: HalDoc = serde_json::from_str(r#"{"halId_s": "hal-1"}"#).unwrap();
        let row = doc.to_row();
        // Empty values are mapped to the sentinel by the orchestrator's
        // normalization pass
        assert_eq!(row[1], "");
        assert_eq!(row[6], "");
    }
}
