//! Whole-set content fingerprint used as the import cache key.

use std::fmt;

use openssl::sha::Sha256;
use serde::Serialize;
use tracing::warn;

use crate::domain::types::{CertificateCandidate, MergerDefaults};

/// Hex SHA-256 over the contents of every readable candidate, concatenated in
/// relative-path order, or the `no-certs` sentinel.
///
/// File names do not enter the digest. Renaming a file without changing the
/// relative order of contents keeps the fingerprint, so aliases in an
/// existing trust store can lag behind a pure rename until the next content
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn no_certs() -> Self {
        Fingerprint(MergerDefaults::NO_CERTS_SENTINEL.to_string())
    }

    pub fn compute(candidates: &[CertificateCandidate]) -> Self {
        let mut ordered: Vec<&CertificateCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let mut hasher = Sha256::new();
        for candidate in ordered {
            match &candidate.contents {
                Ok(bytes) => hasher.update(bytes),
                Err(e) => warn!(
                    file = %candidate.display_name(),
                    error = %e,
                    "Error reading certificate for hash; excluded from fingerprint"
                ),
            }
        }
        Fingerprint(hex::encode(hasher.finish()))
    }

    /// Parse a value persisted by an earlier run. Surrounding whitespace is
    /// ignored; an empty file counts as no previous state.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let value = raw.trim();
        (!value.is_empty()).then(|| Fingerprint(value.to_string()))
    }

    pub fn is_no_certs(&self) -> bool {
        self.0 == MergerDefaults::NO_CERTS_SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
