// crates/engine/src/lib.rs

//! Public facade for the Vardr trust engine.
//! Merges operator-mounted CA certificates into the trust material a
//! framework runtime reads at startup (JVM key store or PEM bundle).

pub mod adapters;
pub mod crypto;
pub mod domain;
pub mod merger;

use domain::error::EngineResult;
use domain::types::MergerConfig;

/// Reconcile into a JKS trust store protected by the configured password.
pub fn reconcile_keystore(config: MergerConfig) -> EngineResult<ReconcileOutcome> {
    let writer = KeyStoreWriter::new(config.keystore_password.clone());
    Merger::new(config, writer).reconcile()
}

/// Reconcile into a flat PEM bundle.
pub fn reconcile_pem_bundle(config: MergerConfig) -> EngineResult<ReconcileOutcome> {
    Merger::new(config, PemBundleWriter::new()).reconcile()
}

// Re-exports for convenience
pub use adapters::{KeyStoreWriter, PemBundleWriter};
pub use crypto::fingerprint::Fingerprint;
pub use domain::error::EngineError;
pub use domain::summary::{ImportSummary, ReconcileOutcome, ReconcileStatus, JSON_LOG_FIELDS};
pub use domain::trust_writer::TrustStoreWriter;
pub use domain::types::{MergerDefaults, MergerEnv, TrustMaterial, ValidationResult};
pub use merger::Merger;
