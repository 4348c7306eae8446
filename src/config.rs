use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default per-request timeout for the Scopus lookup, in seconds.
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Base names of the persisted artifacts, without extension. The extension is
/// fixed per artifact kind (see `store`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileAliases {
    /// Baseline Scopus extraction (input).
    pub scopus: String,
    /// Consolidated Scopus extraction (output, same format as the baseline).
    pub consolidated: String,
    /// Raw HAL extraction report.
    pub hal: String,
    /// DOIs found in HAL but absent from the baseline.
    pub missing_dois: String,
    /// Records added to the baseline by the Scopus lookup.
    pub added_dois: String,
    /// DOIs the Scopus lookup could not resolve.
    pub failed_dois: String,
}

impl Default for FileAliases {
    fn default() -> Self {
        Self {
            scopus: "final_scopus".to_string(),
            consolidated: "final_scopus_hal".to_string(),
            hal: "hal_extraction".to_string(),
            missing_dois: "hal_new_dois".to_string(),
            added_dois: "hal_added_dois".to_string(),
            failed_dois: "scopus_failed_dois".to_string(),
        }
    }
}

/// Pipeline configuration, passed explicitly to the orchestrator instead of
/// living in process-wide globals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Institute name -> working folder holding the per-year subfolders.
    pub institutes: BTreeMap<String, PathBuf>,
    pub files: FileAliases,
    /// Per-request timeout for the Scopus lookup, in seconds.
    pub lookup_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Working folder registered for an institute, matched case-insensitively.
    pub fn working_folder(&self, institute: &str) -> Option<&PathBuf> {
        self.institutes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(institute))
            .map(|(_, path)| path)
    }

    pub fn lookup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.lookup_timeout_secs
                .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aliases_cover_all_artifacts() {
        let files = FileAliases::default();
        let names = [
            &files.scopus,
            &files.consolidated,
            &files.hal,
            &files.missing_dois,
            &files.added_dois,
            &files.failed_dois,
        ];
        for name in names {
            assert!(!name.is_empty());
        }
        // Input and output aliases differ so the baseline survives a run
        assert_ne!(files.scopus, files.consolidated);
    }

    #[test]
    fn parses_toml_config() {
        let config: Config = toml::from_str(
            r#"
            lookup_timeout_secs = 10

            [institutes]
            Liten = "/data/liten/scopus"

            [files]
            scopus = "scopus_2023"
            "#,
        )
        .unwrap();

        assert_eq!(config.lookup_timeout(), std::time::Duration::from_secs(10));
        assert_eq!(
            config.working_folder("liten"),
            Some(&PathBuf::from("/data/liten/scopus"))
        );
        assert_eq!(config.files.scopus, "scopus_2023");
        // Unspecified aliases keep their defaults
        assert_eq!(config.files.hal, "hal_extraction");
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.lookup_timeout(), std::time::Duration::from_secs(30));
    }
}
