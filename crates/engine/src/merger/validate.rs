// crates/engine/src/merger/validate.rs

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::crypto::certificate;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::types::{CertificateCandidate, ValidationResult};

/// Validate every candidate. Results come back in candidate order whatever
/// order the workers finish in.
///
/// Parsing runs on the tokio blocking pool, at most one task per core. If
/// that is not possible (already inside a current-thread runtime) the
/// candidates are validated inline; the outcome is the same.
pub fn validate_all(candidates: &[CertificateCandidate]) -> Vec<ValidationResult> {
    if candidates.len() < 2 {
        return candidates.iter().map(certificate::validate).collect();
    }

    let jobs: Vec<(usize, Vec<u8>)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.contents.as_ref().ok().map(|bytes| (i, bytes.clone())))
        .collect();

    let limit = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    match run_on_current_thread(validate_concurrently(jobs, limit)) {
        Ok(parsed) => {
            let mut results: Vec<Option<ValidationResult>> = vec![None; candidates.len()];
            for (index, result) in parsed {
                results[index] = Some(result);
            }
            candidates
                .iter()
                .zip(results)
                .map(|(candidate, result)| result.unwrap_or_else(|| certificate::validate(candidate)))
                .collect()
        }
        Err(e) => {
            warn!(error = %e, "Concurrent validation unavailable; validating inline");
            candidates.iter().map(certificate::validate).collect()
        }
    }
}

async fn validate_concurrently(
    jobs: Vec<(usize, Vec<u8>)>,
    limit: usize,
) -> EngineResult<Vec<(usize, ValidationResult)>> {
    debug!(jobs = jobs.len(), workers = limit, "Validating certificates");
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();

    for (index, bytes) in jobs {
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;
            let result = tokio::task::spawn_blocking(move || certificate::validate_bytes(&bytes))
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;
            Ok::<_, EngineError>((index, result))
        });
    }

    let mut out = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        out.push(joined.map_err(|e| EngineError::Worker(e.to_string()))??);
    }
    Ok(out)
}

pub fn run_on_current_thread<F, T>(fut: F) -> EngineResult<T>
where
    F: std::future::Future<Output = EngineResult<T>>,
{
    // Inside a multi-thread runtime, block this worker in place instead of
    // nesting a runtime. A current-thread runtime cannot be blocked.
    if let Ok(handle) = Handle::try_current() {
        if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
            return tokio::task::block_in_place(|| handle.block_on(fut));
        }
        return Err(EngineError::Worker(
            "cannot block inside a current-thread runtime".into(),
        ));
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EngineError::Worker(format!("failed to create tokio runtime: {e}")))?;
    rt.block_on(fut)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(alias: &str, contents: Vec<u8>) -> CertificateCandidate {
        CertificateCandidate {
            path: format!("/certs/{alias}.crt").into(),
            relative_path: format!("{alias}.crt").into(),
            alias: alias.to_string(),
            contents: Ok(contents),
        }
    }

    fn mixed() -> Vec<CertificateCandidate> {
        let pem = |name: &str| {
            rcgen::generate_simple_self_signed(vec![format!("{name}.example.test")])
                .unwrap()
                .serialize_pem()
                .unwrap()
                .into_bytes()
        };
        vec![
            candidate("a", pem("a")),
            candidate("b", b"not a cert".to_vec()),
            candidate("c", pem("c")),
            CertificateCandidate {
                contents: Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
                ..candidate("d", Vec::new())
            },
        ]
    }

    fn verdicts(results: &[ValidationResult]) -> Vec<bool> {
        results.iter().map(ValidationResult::is_valid).collect()
    }

    #[test]
    fn results_keep_candidate_order() {
        let results = validate_all(&mixed());
        assert_eq!(verdicts(&results), [true, false, true, false]);
        assert!(results[3].outcome().starts_with("FAILED: unreadable: "));
    }

    #[test]
    fn current_thread_runtime_cannot_block() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let res: EngineResult<()> = rt.block_on(async { run_on_current_thread(async { Ok(()) }) });
        assert!(matches!(res, Err(EngineError::Worker(_))));
    }

    #[test]
    fn validates_inline_inside_current_thread_runtime() {
        let candidates = mixed();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let results = rt.block_on(async { validate_all(&candidates) });
        assert_eq!(verdicts(&results), [true, false, true, false]);
    }

    #[test]
    fn validates_from_multi_thread_worker() {
        let candidates = mixed();
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let results = rt.block_on(async { validate_all(&candidates) });
        assert_eq!(verdicts(&results), [true, false, true, false]);
    }
}
