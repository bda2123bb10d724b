pub mod certificate;
pub mod fingerprint;
