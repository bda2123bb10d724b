// crates/engine/src/merger/mod.rs

//! Certificate merger: check the fingerprint cache, then rebuild or skip.

pub mod scan;
pub mod state;
pub mod validate;

use std::path::PathBuf;

use tracing::{info, warn};

use crate::crypto::fingerprint::Fingerprint;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::summary::{ImportSummary, ReconcileOutcome, ReconcileStatus};
use crate::domain::trust_writer::TrustStoreWriter;
use crate::domain::types::{CertificateCandidate, MergerConfig, TrustMaterial, ValidationResult};
use scan::Scan;

/// Produces up-to-date trust material for one runtime, parameterized by the
/// output format.
pub struct Merger<W> {
    config: MergerConfig,
    writer: W,
}

impl<W: TrustStoreWriter> Merger<W> {
    pub fn new(config: MergerConfig, writer: W) -> Self {
        Self { config, writer }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn trust_material_path(&self) -> PathBuf {
        self.config.state_dir.join(self.writer.file_name())
    }

    /// Bring the trust material in the state directory up to date with the
    /// candidates directory.
    ///
    /// Only a failure to write the trust material is an `Err`. Bad
    /// certificates, a missing or unreadable candidates directory and an
    /// unreadable cache all degrade to warnings.
    pub fn reconcile(&self) -> EngineResult<ReconcileOutcome> {
        info!(
            dir = %self.config.candidates_dir.display(),
            "Checking for certificates"
        );
        let scan = scan::discover(&self.config);
        let fingerprint = match &scan {
            Scan::Missing => Fingerprint::no_certs(),
            Scan::Found(candidates) => Fingerprint::compute(candidates),
        };

        let target = self.trust_material_path();
        let fingerprint_path = self.config.fingerprint_path();
        if state::read_fingerprint(&fingerprint_path).as_ref() == Some(&fingerprint) {
            if target.is_file() {
                info!(
                    event = "certificates_unchanged",
                    fingerprint = %fingerprint,
                    "Certificates unchanged, skipping import"
                );
                return Ok(ReconcileOutcome {
                    fingerprint,
                    trust_material_path: target,
                    status: ReconcileStatus::Unchanged,
                    fingerprint_saved: true,
                });
            }
            warn!(
                path = %target.display(),
                "Certificate fingerprint matches but trust material is missing; rebuilding"
            );
        }

        let candidates = scan.into_candidates();
        state::ensure_state_dir(&self.config.state_dir)?;

        let base = self.load_base();
        let base_entries = self.writer.entry_count(&base);
        let results = validate::validate_all(&candidates);
        let (material, summary) = assemble(base, &candidates, results);

        let entries = self.writer.entry_count(&material);
        let bytes = self.writer.render(&material)?;
        state::write_atomic(&target, &bytes).map_err(|source| EngineError::TrustMaterialWrite {
            path: target.clone(),
            source,
        })?;
        info!(
            event = "trust_material_written",
            path = %target.display(),
            entries,
            base_entries,
            "Wrote trust material"
        );

        // Only after the trust material is in place; a crash before this
        // line means the next start rebuilds.
        let fingerprint_saved =
            match state::write_atomic(&fingerprint_path, fingerprint.as_str().as_bytes()) {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        path = %fingerprint_path.display(),
                        error = %e,
                        "Error saving certificate hash; next start will rebuild"
                    );
                    false
                }
            };

        log_summary(&summary);

        Ok(ReconcileOutcome {
            fingerprint,
            trust_material_path: target,
            status: ReconcileStatus::Rebuilt {
                summary,
                entries,
                base_entries,
            },
            fingerprint_saved,
        })
    }

    fn load_base(&self) -> TrustMaterial {
        let Some(path) = &self.config.base_trust else {
            return TrustMaterial::new();
        };
        let loaded = std::fs::read(path)
            .map_err(EngineError::from)
            .and_then(|bytes| self.writer.load(&bytes));
        match loaded {
            Ok(material) => {
                info!(
                    path = %path.display(),
                    entries = self.writer.entry_count(&material),
                    "Loaded base trust material"
                );
                material
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Base trust material unavailable; continuing with custom certificates only"
                );
                TrustMaterial::new()
            }
        }
    }
}

/// Fold validation results into the material in candidate (sorted) order,
/// so a repeated alias resolves to the file that sorts last.
fn assemble(
    mut material: TrustMaterial,
    candidates: &[CertificateCandidate],
    results: Vec<ValidationResult>,
) -> (TrustMaterial, ImportSummary) {
    let mut summary = ImportSummary::default();
    if candidates.is_empty() {
        info!("No certificates found to import");
    } else {
        info!("Found {} certificate(s)...", candidates.len());
    }

    for (candidate, result) in candidates.iter().zip(results) {
        let alias = candidate.alias.as_str();
        info!("Importing {} from {}", alias, candidate.display_name());
        summary.record(alias, &result);
        match result {
            ValidationResult::Valid(certs) => {
                if material.insert(alias, certs).is_some() {
                    warn!(
                        alias,
                        file = %candidate.display_name(),
                        "Alias already present; replacing earlier entry"
                    );
                }
                info!("Successfully imported {}", alias);
            }
            ValidationResult::Invalid(reason) => {
                warn!("Could not import {}: {}", alias, reason);
            }
        }
    }
    (material, summary)
}

fn log_summary(summary: &ImportSummary) {
    info!(
        event = "certificate_import_summary",
        successful_imports = summary.successful_imports,
        failed_imports = summary.failed_imports,
        total_certificates = summary.total_certificates,
        results = %summary.results_json(),
        "Certificate import completed: {} successful, {} failed",
        summary.successful_imports,
        summary.failed_imports
    );
}
