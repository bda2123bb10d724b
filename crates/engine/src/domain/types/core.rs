use std::path::{Path, PathBuf};

use openssl::x509::X509;

/// A file under the candidates directory whose name ends in the certificate
/// suffix. Discovered fresh on every run and never modified.
#[derive(Debug)]
pub struct CertificateCandidate {
    pub path: PathBuf,
    /// Path relative to the candidates directory. This is the sort key for
    /// both the fingerprint and alias tie-breaks.
    pub relative_path: PathBuf,
    /// File name with the certificate suffix stripped.
    pub alias: String,
    /// Bytes as read during the scan. The fingerprint and validation share
    /// this one snapshot.
    pub contents: Result<Vec<u8>, std::io::Error>,
}

impl CertificateCandidate {
    pub fn read(root: &Path, relative_path: PathBuf, suffix: &str) -> Self {
        let path = root.join(&relative_path);
        let alias = alias_for(&relative_path, suffix);
        let contents = std::fs::read(&path);
        Self {
            path,
            relative_path,
            alias,
            contents,
        }
    }

    /// File name for log lines.
    pub fn display_name(&self) -> String {
        self.relative_path.display().to_string()
    }
}

/// `root-ca.crt` becomes `root-ca`; only the trailing suffix is removed.
pub fn alias_for(relative_path: &Path, suffix: &str) -> String {
    let name = relative_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(suffix) {
        Some(stem) => stem.to_owned(),
        None => name,
    }
}

/// Per-candidate outcome.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Every certificate block found in the file, in file order.
    Valid(Vec<X509>),
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    /// `"SUCCESS"` or `"FAILED: <reason>"`, as reported in the summary.
    pub fn outcome(&self) -> String {
        match self {
            ValidationResult::Valid(_) => "SUCCESS".to_string(),
            ValidationResult::Invalid(reason) => format!("FAILED: {reason}"),
        }
    }
}
