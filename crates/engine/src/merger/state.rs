// crates/engine/src/merger/state.rs

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::crypto::fingerprint::Fingerprint;
use crate::domain::error::{EngineError, EngineResult};

/// Fingerprint from the previous run. Missing or unreadable means no
/// previous state, which forces a rebuild.
pub fn read_fingerprint(path: &Path) -> Option<Fingerprint> {
    match fs::read_to_string(path) {
        Ok(raw) => Fingerprint::from_stored(&raw),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No stored certificate fingerprint");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Error checking certificate hash");
            None
        }
    }
}

pub fn ensure_state_dir(dir: &Path) -> EngineResult<()> {
    fs::create_dir_all(dir).map_err(|source| EngineError::StateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Replace `target` with `bytes` through a temp file in the same directory
/// and a rename, so readers see either the old file or the new one.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    // The application may run as another user than the entrypoint.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("certs.hash");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
        // no temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_fingerprint_is_no_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_fingerprint(&dir.path().join("certs.hash")).is_none());
    }

    #[test]
    fn state_dir_under_a_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, b"x").unwrap();
        let err = ensure_state_dir(&file.join("state")).unwrap_err();
        assert!(matches!(err, EngineError::StateDir { .. }));
    }
}
