//! Runtime configuration from environment variables.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use crate::adapters::xgboost::manifest::verifying_key_from_b64;
use crate::adapters::ModelTrust;
use crate::NephroError;

pub const MODEL_PATH_ENV: &str = "NEPHRO_MODEL_PATH";
pub const LOG_MODE_ENV: &str = "NEPHRO_LOG_MODE";
pub const LOG_FILE_ENV: &str = "NEPHRO_LOG_FILE";
pub const ALLOW_UNSIGNED_MODELS_ENV: &str = "NEPHRO_ALLOW_UNSIGNED_MODELS";
pub const PUBKEY_ENV: &str = "NEPHRO_MODEL_SIGNING_PUBKEY_B64";
pub const PUBKEY_FILE_ENV: &str = "NEPHRO_MODEL_SIGNING_PUBKEY_B64_FILE";

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_LOG_FILE: &str = "nephrocheck.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Result<Self, NephroError> {
        match value.trim() {
            "" | "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            other => Err(NephroError::Config(format!(
                "{LOG_MODE_ENV} must be auto, file or stdout (got {other:?})"
            ))),
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::Auto => interactive,
            Self::File => true,
            Self::Stdout => false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub allow_unsigned_models: bool,
    /// Base64 Ed25519 verifying key, inline or read from file
    pub signing_pubkey_b64: Option<String>,
}

/// `1/true/TRUE/yes/YES` are true; anything else is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `NephroError::Config` for malformed values, `NephroError::Io`
    /// if the public key file cannot be read.
    pub fn from_env() -> Result<Self, NephroError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NephroError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup(MODEL_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from);

        let log_mode = lookup(LOG_MODE_ENV)
            .map(|v| LogMode::parse(&v))
            .transpose()?
            .unwrap_or(LogMode::Auto);

        let log_file = lookup(LOG_FILE_ENV)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);

        let allow_unsigned_models = lookup(ALLOW_UNSIGNED_MODELS_ENV)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let signing_pubkey_b64 = match lookup(PUBKEY_ENV).filter(|v| !v.trim().is_empty()) {
            Some(b64) => Some(b64.trim().to_string()),
            None => match lookup(PUBKEY_FILE_ENV).filter(|v| !v.trim().is_empty()) {
                Some(path) => Some(std::fs::read_to_string(path.trim())?.trim().to_string()),
                None => None,
            },
        };

        Ok(Self {
            model_path,
            log_mode,
            log_file,
            allow_unsigned_models,
            signing_pubkey_b64,
        })
    }

    /// Trust settings for loading the classifier.
    ///
    /// # Errors
    /// Returns `NephroError::Classifier` if the configured key is malformed.
    pub fn model_trust(&self) -> Result<ModelTrust, NephroError> {
        let verifying_key = self
            .signing_pubkey_b64
            .as_deref()
            .map(verifying_key_from_b64)
            .transpose()?;

        if self.allow_unsigned_models && !cfg!(debug_assertions) {
            tracing::warn!("{ALLOW_UNSIGNED_MODELS_ENV} is ignored in release builds");
        }

        Ok(ModelTrust {
            verifying_key,
            allow_unsigned: self.allow_unsigned_models,
        })
    }

    /// Open the log file for appending, creating missing parent directories.
    ///
    /// # Errors
    /// Returns `NephroError::Config` naming the path that could not be
    /// created or opened.
    pub fn open_log_file(&self) -> Result<File, NephroError> {
        if let Some(parent) = self.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    NephroError::Config(format!("Cannot create log directory {parent:?}: {e}"))
                })?;
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|e| {
                NephroError::Config(format!("Cannot open log file {:?}: {e}", self.log_file))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.model_path, PathBuf::from("models"));
        assert_eq!(config.log_mode, LogMode::Auto);
        assert_eq!(config.log_file, PathBuf::from("nephrocheck.log"));
        assert!(!config.allow_unsigned_models);
        assert!(config.signing_pubkey_b64.is_none());

        let trust = config.model_trust().expect("trust");
        assert!(trust.verifying_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (MODEL_PATH_ENV, "/opt/models/ckd"),
            (LOG_MODE_ENV, "stdout"),
            (LOG_FILE_ENV, "/tmp/n.log"),
            (ALLOW_UNSIGNED_MODELS_ENV, "yes"),
        ]))
        .expect("config");
        assert_eq!(config.model_path, PathBuf::from("/opt/models/ckd"));
        assert_eq!(config.log_mode, LogMode::Stdout);
        assert_eq!(config.log_file, PathBuf::from("/tmp/n.log"));
        assert!(config.allow_unsigned_models);
    }

    #[test]
    fn test_invalid_log_mode() {
        let err = AppConfig::from_lookup(lookup_from(&[(LOG_MODE_ENV, "syslog")])).unwrap_err();
        assert!(matches!(err, NephroError::Config(_)));
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", "yes", "YES", " true "] {
            assert!(parse_bool(v), "{v:?}");
        }
        for v in ["0", "false", "True", "on", ""] {
            assert!(!parse_bool(v), "{v:?}");
        }
    }

    #[test]
    fn test_log_mode_resolution() {
        assert!(LogMode::Auto.use_file(true));
        assert!(!LogMode::Auto.use_file(false));
        assert!(LogMode::File.use_file(false));
        assert!(!LogMode::Stdout.use_file(true));
    }

    #[test]
    fn test_pubkey_from_file() {
        use base64::Engine;
        use ed25519_dalek::SigningKey;
        use std::io::Write;

        let key = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.to_bytes());

        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "{b64}").expect("write key");
        let path = file.path().to_string_lossy().to_string();

        let config =
            AppConfig::from_lookup(lookup_from(&[(PUBKEY_FILE_ENV, path.as_str())])).expect("config");
        assert_eq!(config.signing_pubkey_b64.as_deref(), Some(b64.as_str()));
        let trust = config.model_trust().expect("trust");
        assert_eq!(trust.verifying_key, Some(key));
    }

    #[test]
    fn test_inline_pubkey_wins_and_is_validated() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (PUBKEY_ENV, "not-a-key"),
            (PUBKEY_FILE_ENV, "/nonexistent/key.b64"),
        ]))
        .expect("config");
        assert!(matches!(
            config.model_trust(),
            Err(NephroError::Classifier(_))
        ));
    }

    #[test]
    fn test_missing_pubkey_file_is_io_error() {
        let err = AppConfig::from_lookup(lookup_from(&[(PUBKEY_FILE_ENV, "/nonexistent/key.b64")]))
            .unwrap_err();
        assert!(matches!(err, NephroError::Io(_)));
    }

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_file = temp.path().join("logs/nested/nephrocheck.log");
        let config = AppConfig {
            log_file: log_file.clone(),
            ..AppConfig::from_lookup(lookup_from(&[])).expect("config")
        };

        config.open_log_file().expect("open log file");
        assert!(log_file.is_file());
    }

    #[test]
    fn test_open_log_file_reports_unusable_directory() {
        let blocker = NamedTempFile::new().expect("temp file");
        let config = AppConfig {
            log_file: blocker.path().join("logs/nephrocheck.log"),
            ..AppConfig::from_lookup(lookup_from(&[])).expect("config")
        };

        match config.open_log_file() {
            Err(NephroError::Config(msg)) => {
                assert!(msg.contains("Cannot create log directory"));
                assert!(msg.contains(&*blocker.path().to_string_lossy()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
