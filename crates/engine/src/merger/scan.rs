// crates/engine/src/merger/scan.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::types::{CertificateCandidate, MergerConfig};

/// What the candidates directory looked like for this run.
#[derive(Debug)]
pub enum Scan {
    /// The directory does not exist. Normal when nothing is mounted.
    Missing,
    /// Candidates sorted by relative path. Empty when the directory is empty
    /// or could not be listed.
    Found(Vec<CertificateCandidate>),
}

impl Scan {
    pub fn into_candidates(self) -> Vec<CertificateCandidate> {
        match self {
            Scan::Missing => Vec::new(),
            Scan::Found(candidates) => candidates,
        }
    }
}

pub fn discover(config: &MergerConfig) -> Scan {
    let root = config.candidates_dir.as_path();
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            warn!(dir = %root.display(), "Certificates path is not a directory; treating as empty");
            return Scan::Found(Vec::new());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(dir = %root.display(), "No certificates directory found");
            return Scan::Missing;
        }
        Err(e) => {
            warn!(dir = %root.display(), error = %e, "Certificates directory unreadable; treating as empty");
            return Scan::Found(Vec::new());
        }
    }

    let suffix = config.cert_suffix.as_str();
    let mut relative = list_matching(root, Path::new(""), suffix);
    if let Some(nested) = &config.nested_dir {
        if root.join(nested).is_dir() {
            relative.extend(list_matching(root, Path::new(nested), suffix));
        }
    }
    relative.sort();

    info!(count = relative.len(), "Found {} {} files in directory", relative.len(), suffix);
    Scan::Found(
        relative
            .into_iter()
            .map(|rel| CertificateCandidate::read(root, rel, suffix))
            .collect(),
    )
}

/// Non-directory entries of `root/sub` whose name ends in `suffix`
/// (case-sensitive), as paths relative to `root`.
fn list_matching(root: &Path, sub: &Path, suffix: &str) -> Vec<PathBuf> {
    let dir = root.join(sub);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not list certificates directory");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            name.ends_with(suffix).then(|| sub.join(name))
        })
        .collect()
}
