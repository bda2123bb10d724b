// crates/engine/src/domain/summary.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::types::ValidationResult;
use crate::crypto::fingerprint::Fingerprint;

/// Log fields that carry a serialized JSON document. Structured log output
/// embeds them as values instead of strings.
pub const JSON_LOG_FIELDS: &[&str] = &["results"];

/// End-of-run import summary, emitted once as a log record.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub successful_imports: usize,
    pub failed_imports: usize,
    pub total_certificates: usize,
    /// Alias to `"SUCCESS"` or `"FAILED: <reason>"`. Colliding aliases keep
    /// the outcome of the file that sorts last; counts still include both.
    pub results: BTreeMap<String, String>,
}

impl ImportSummary {
    pub fn record(&mut self, alias: &str, result: &ValidationResult) {
        self.total_certificates += 1;
        if result.is_valid() {
            self.successful_imports += 1;
        } else {
            self.failed_imports += 1;
        }
        self.results.insert(alias.to_string(), result.outcome());
    }

    /// The per-alias mapping as a JSON object string, for log fields.
    pub fn results_json(&self) -> String {
        serde_json::to_string(&self.results).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// Fingerprint matched and the trust material is present; nothing written.
    Unchanged,
    Rebuilt {
        summary: ImportSummary,
        /// Entries in the written trust material as the runtime sees them
        /// (key store entries, or certificate blocks in a PEM bundle), base
        /// entries included.
        entries: usize,
        base_entries: usize,
    },
}

/// Result of one `reconcile` call.
#[derive(Debug, Serialize, Clone)]
pub struct ReconcileOutcome {
    pub fingerprint: Fingerprint,
    /// Where the runtime should look for the trust material.
    pub trust_material_path: PathBuf,
    #[serde(flatten)]
    pub status: ReconcileStatus,
    /// False when the fingerprint could not be persisted; the next start
    /// will rebuild again.
    pub fingerprint_saved: bool,
}

impl ReconcileOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self.status, ReconcileStatus::Unchanged)
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        match &self.status {
            ReconcileStatus::Rebuilt { summary, .. } => Some(summary),
            ReconcileStatus::Unchanged => None,
        }
    }
}
