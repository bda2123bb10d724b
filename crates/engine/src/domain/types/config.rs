use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

/// Centralized defaults for the trust engine.
/// Paths match the layout of the Vardr base images.
pub struct MergerDefaults;

impl MergerDefaults {
    // Layout defaults
    pub const CANDIDATES_DIR: &'static str = "/certs"; // Read-only operator mount
    pub const STATE_DIR: &'static str = "/app"; // Writable, one per container
    pub const FINGERPRINT_FILE: &'static str = "certs.hash";
    pub const CERT_SUFFIX: &'static str = ".crt"; // Case-sensitive
    pub const NESTED_DIR: &'static str = "certs";
    pub const SCAN_NESTED: bool = false; // Immediate children only

    // Output defaults
    pub const KEYSTORE_FILE: &'static str = "cacerts";
    pub const KEYSTORE_PASSWORD: &'static str = "changeit"; // JVM convention
    pub const PEM_BUNDLE_FILE: &'static str = "custom_ca_bundle.pem";
    pub const HAS_BASE_TRUST: Option<PathBuf> = None; // Custom certificates only
    /// Prefix for base trust aliases. File stems never contain a path
    /// separator, so a mounted file cannot replace a base entry.
    pub const BASE_ALIAS_PREFIX: &'static str = "base/";

    /// Fingerprint recorded when the candidates directory does not exist.
    /// Never a valid hex digest, so it cannot equal a real set fingerprint.
    pub const NO_CERTS_SENTINEL: &'static str = "no-certs";
}

/// Environment variables understood by [`MergerConfig::from_env`].
pub struct MergerEnv;

impl MergerEnv {
    pub const CANDIDATES_DIR: &'static str = "VARD_CERTS_DIR";
    pub const STATE_DIR: &'static str = "VARD_STATE_DIR";
    pub const SCAN_NESTED: &'static str = "VARD_SCAN_NESTED";
    pub const KEYSTORE_PASSWORD: &'static str = "VARD_TRUSTSTORE_PASSWORD";
    pub const BASE_TRUST: &'static str = "VARD_BASE_TRUST";
    pub const JSON_LOGS: &'static str = "VARD_JSON_LOGS";
}

/// Configuration for one reconciliation. Passed into the merger explicitly;
/// nothing here is process-global.
#[derive(Clone)]
pub struct MergerConfig {
    pub candidates_dir: PathBuf,
    pub state_dir: PathBuf,
    pub fingerprint_file: String,
    pub cert_suffix: String,
    /// Also scan this subdirectory of `candidates_dir` (one level, no deeper).
    pub nested_dir: Option<String>,
    /// Trust material copied in before the custom certificates: a system CA
    /// bundle for PEM output, a pristine JVM `cacerts` for key store output.
    /// Must not point at the output file, or stale entries accumulate.
    pub base_trust: Option<PathBuf>,
    pub keystore_password: Zeroizing<String>,
}

impl fmt::Debug for MergerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergerConfig")
            .field("candidates_dir", &self.candidates_dir)
            .field("state_dir", &self.state_dir)
            .field("fingerprint_file", &self.fingerprint_file)
            .field("cert_suffix", &self.cert_suffix)
            .field("nested_dir", &self.nested_dir)
            .field("base_trust", &self.base_trust)
            .field("keystore_password", &"<redacted>")
            .finish()
    }
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self::with_dirs(MergerDefaults::CANDIDATES_DIR, MergerDefaults::STATE_DIR)
    }
}

impl MergerConfig {
    /// Defaults with explicit directories; handy for tests and embedding.
    pub fn with_dirs(candidates_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            candidates_dir: candidates_dir.into(),
            state_dir: state_dir.into(),
            fingerprint_file: MergerDefaults::FINGERPRINT_FILE.to_string(),
            cert_suffix: MergerDefaults::CERT_SUFFIX.to_string(),
            nested_dir: MergerDefaults::SCAN_NESTED.then(|| MergerDefaults::NESTED_DIR.to_string()),
            base_trust: MergerDefaults::HAS_BASE_TRUST,
            keystore_password: Zeroizing::new(MergerDefaults::KEYSTORE_PASSWORD.to_string()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut cfg = Self::default();
        if let Some(dir) = get(MergerEnv::CANDIDATES_DIR) {
            cfg.candidates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(MergerEnv::STATE_DIR) {
            cfg.state_dir = PathBuf::from(dir);
        }
        if get(MergerEnv::SCAN_NESTED).is_some_and(|v| parse_flag(&v)) {
            cfg.nested_dir = Some(MergerDefaults::NESTED_DIR.to_string());
        }
        if let Some(password) = get(MergerEnv::KEYSTORE_PASSWORD) {
            cfg.keystore_password = Zeroizing::new(password);
        }
        if let Some(base) = get(MergerEnv::BASE_TRUST) {
            cfg.base_trust = Some(PathBuf::from(base));
        }
        cfg
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.state_dir.join(&self.fingerprint_file)
    }
}

/// Boolean environment flag: `true`, `1`, `yes`, `on` (any case).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
