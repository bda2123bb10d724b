//! Syntactic X.509 validation. No chain building, expiry or revocation
//! checks happen here; the runtime's TLS stack owns those.

use openssl::x509::X509;

use crate::domain::types::{CertificateCandidate, ValidationResult};

/// Every PEM certificate block in `bytes`. A file with no certificate block
/// at all, or with a block that does not decode, is rejected.
pub fn parse_pem_certificates(bytes: &[u8]) -> Result<Vec<X509>, String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err("empty file".to_string());
    }
    let certs = X509::stack_from_pem(bytes)
        .map_err(|e| format!("malformed PEM certificate: {}", first_reason(&e)))?;
    if certs.is_empty() {
        return Err("no PEM certificate found".to_string());
    }
    Ok(certs)
}

pub fn validate_bytes(bytes: &[u8]) -> ValidationResult {
    match parse_pem_certificates(bytes) {
        Ok(certs) => ValidationResult::Valid(certs),
        Err(reason) => ValidationResult::Invalid(reason),
    }
}

pub fn validate(candidate: &CertificateCandidate) -> ValidationResult {
    match &candidate.contents {
        Ok(bytes) => validate_bytes(bytes),
        Err(e) => ValidationResult::Invalid(format!("unreadable: {e}")),
    }
}

fn first_reason(stack: &openssl::error::ErrorStack) -> String {
    stack
        .errors()
        .iter()
        .find_map(|e| e.reason().map(str::to_string))
        .unwrap_or_else(|| stack.to_string())
}
