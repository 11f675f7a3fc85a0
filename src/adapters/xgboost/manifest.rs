//! Signed model manifests.
//!
//! A model directory may carry `manifest.json` (SHA-256 of every bound file)
//! and `model.sig` (Ed25519 signature over the exact manifest bytes). The
//! classifier refuses to load a model file the manifest does not bind.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::ClassifierError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// Allowed clock skew for `created_at` (seconds).
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Manifest binding model files to their SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// File name relative to the model directory -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Trust settings for model loading.
#[derive(Debug, Clone, Default)]
pub struct ModelTrust {
    /// Key that must have signed the manifest
    pub verifying_key: Option<VerifyingKey>,
    /// Accept a directory without signature files. Honored in debug builds only.
    pub allow_unsigned: bool,
}

impl ModelTrust {
    #[must_use]
    pub fn with_key(key: VerifyingKey) -> Self {
        Self {
            verifying_key: Some(key),
            allow_unsigned: false,
        }
    }

    fn unsigned_allowed(&self) -> bool {
        cfg!(debug_assertions) && self.allow_unsigned
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ClassifierError::Signature` if the key is malformed.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ClassifierError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ClassifierError::Signature("Invalid public key base64".into()))?;
    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ClassifierError::Signature("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| ClassifierError::Signature("Invalid verifying key".into()))
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

// Constant-time compare for ASCII hex digests.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |diff, (x, y)| diff | (x ^ y))
        == 0
}

/// Verify the signed manifest in `base_dir` and that it binds `model_file`.
///
/// Returns `Ok(None)` when the directory is unsigned and `trust` allows it.
///
/// # Errors
/// Returns `ClassifierError::Signature` on any verification failure.
pub fn verify_model_dir(
    base_dir: &Path,
    model_file: &str,
    trust: &ModelTrust,
) -> Result<Option<ModelManifest>, ClassifierError> {
    let sig_path = base_dir.join(SIGNATURE_FILE);
    let manifest_path = base_dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        if trust.unsigned_allowed() {
            tracing::warn!(
                "Loading UNSIGNED model from {:?}. Only allowed in debug builds.",
                base_dir
            );
            return Ok(None);
        }
        tracing::error!("Model signature not found at {:?}", sig_path);
        return Err(ClassifierError::Signature(format!(
            "{SIGNATURE_FILE} and {MANIFEST_FILE} are required in {}",
            base_dir.display()
        )));
    }

    let key = trust.verifying_key.as_ref().ok_or_else(|| {
        ClassifierError::Signature("Model is signed but no verifying key is configured".into())
    })?;

    let sig_bytes = fs::read(&sig_path)
        .map_err(|e| ClassifierError::Signature(format!("Failed to read signature: {e}")))?;
    let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ClassifierError::Signature("Invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig_bytes);

    let manifest_bytes = fs::read(&manifest_path)
        .map_err(|e| ClassifierError::Signature(format!("Failed to read manifest: {e}")))?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ClassifierError::Signature("Invalid model signature".into()))?;

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ClassifierError::Signature(format!("Invalid manifest format: {e}")))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(ClassifierError::Signature(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    if manifest.created_at > unix_now() + MAX_FUTURE_SKEW_SECS {
        return Err(ClassifierError::Signature(
            "Manifest created_at is in the future".into(),
        ));
    }
    if !manifest.files.contains_key(model_file) {
        return Err(ClassifierError::Signature(format!(
            "Manifest does not bind {model_file}"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let path = base_dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            ClassifierError::Signature(format!(
                "Manifest references missing/unreadable file {:?}: {e}",
                path
            ))
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), &expected_hex.to_ascii_lowercase()) {
            return Err(ClassifierError::Signature(format!(
                "File hash mismatch for {rel}"
            )));
        }
    }

    tracing::info!(
        "Model manifest verified ({} file(s) bound)",
        manifest.files.len()
    );
    Ok(Some(manifest))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    pub fn signing_key() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    /// Write `manifest.json` and `model.sig` binding the given files.
    pub fn sign_dir(dir: &Path, key: &SigningKey, files: &[&str]) {
        let mut map = BTreeMap::new();
        for rel in files {
            let bytes = fs::read(dir.join(rel)).unwrap_or_default();
            map.insert((*rel).to_string(), sha256_hex(&bytes));
        }
        let manifest = ModelManifest {
            version: MANIFEST_VERSION,
            created_at: unix_now(),
            files: map,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &manifest_bytes).expect("write manifest");
        let signature: Signature = key.sign(&manifest_bytes);
        fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write signature");
    }
}
