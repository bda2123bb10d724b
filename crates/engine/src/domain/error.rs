// crates/engine/src/domain/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions only. Per-certificate failures and an unreadable
/// candidates directory are logged and reported through the summary instead.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("state directory {} is not writable: {source}", path.display())]
  StateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write trust material to {}: {source}", path.display())]
  TrustMaterialWrite {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode trust material: {0}")]
  Encode(String),

  #[error("trust material is unreadable: {0}")]
  Decode(String),

  #[error(transparent)]
  OpenSsl(#[from] openssl::error::ErrorStack),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("validation worker failed: {0}")]
  Worker(String),
}

impl EngineError {
  /// True when the runtime was left without updated trust material.
  pub fn is_write_failure(&self) -> bool {
    matches!(self, EngineError::StateDir { .. } | EngineError::TrustMaterialWrite { .. })
  }
}

pub type EngineResult<T> = Result<T, EngineError>;
