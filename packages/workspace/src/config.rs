use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use folio_common::{FileStorage, StorageError};
use folio_editor::SyncConfig;
use folio_linter::{HttpLintClient, LintError, QualityConfig};

const DEFAULT_DATA_DIR: &str = "./.folio";
const DEFAULT_LINT_URL: &str = "http://127.0.0.1:3030/api/lint";

/// Runtime configuration loaded from environment variables.
///
/// Every field has a default suitable for local use. A value that fails to
/// parse is logged and replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolioConfig {
    /// Directory of the file-backed history storage
    pub data_dir: PathBuf,
    /// Surface edit to canonical text quiet interval
    pub sync_debounce: Duration,
    /// Canonical text to quality check quiet interval
    pub lint_debounce: Duration,
    pub lint_url: String,
    pub lint_timeout: Duration,
    /// Longer texts skip the lint service
    pub lint_max_chars: usize,
}

impl Default for FolioConfig {
    fn default() -> Self {
        let sync = SyncConfig::default();
        let quality = QualityConfig::default();

        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sync_debounce: sync.debounce,
            lint_debounce: quality.debounce,
            lint_url: DEFAULT_LINT_URL.to_string(),
            lint_timeout: quality.remote_timeout,
            lint_max_chars: quality.max_chars,
        }
    }
}

impl FolioConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `FOLIO_DATA_DIR`         | `./.folio`                       |
    /// | `FOLIO_SYNC_DEBOUNCE_MS` | `500`                            |
    /// | `FOLIO_LINT_DEBOUNCE_MS` | `2000`                           |
    /// | `FOLIO_LINT_URL`         | `http://127.0.0.1:3030/api/lint` |
    /// | `FOLIO_LINT_TIMEOUT_MS`  | `5000`                           |
    /// | `FOLIO_LINT_MAX_CHARS`   | `100000`                         |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FolioConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("FOLIO_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let lint_url = lookup("FOLIO_LINT_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.lint_url);

        Self {
            data_dir,
            sync_debounce: millis(&lookup, "FOLIO_SYNC_DEBOUNCE_MS", defaults.sync_debounce),
            lint_debounce: millis(&lookup, "FOLIO_LINT_DEBOUNCE_MS", defaults.lint_debounce),
            lint_url,
            lint_timeout: millis(&lookup, "FOLIO_LINT_TIMEOUT_MS", defaults.lint_timeout),
            lint_max_chars: parsed(&lookup, "FOLIO_LINT_MAX_CHARS", defaults.lint_max_chars),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            debounce: self.sync_debounce,
        }
    }

    pub fn quality_config(&self) -> QualityConfig {
        QualityConfig {
            debounce: self.lint_debounce,
            remote_timeout: self.lint_timeout,
            max_chars: self.lint_max_chars,
        }
    }

    pub fn lint_client(&self) -> Result<HttpLintClient, LintError> {
        HttpLintClient::new(self.lint_url.clone(), self.lint_timeout)
    }

    /// Open (creating if needed) the history storage directory
    pub fn storage(&self) -> Result<FileStorage, StorageError> {
        FileStorage::open(&self.data_dir)
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(
                "[Config] invalid {}={:?}, using default {:?}",
                key,
                raw,
                default
            );
            default
        }
    }
}

fn millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(parsed(lookup, key, default_ms))
}
