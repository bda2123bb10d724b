#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vardr_engine as ve;

/// Generate a self-signed certificate in PEM format using rcgen.
pub fn generate_cert_pem(name: &str) -> String {
    let cert = rcgen::generate_simple_self_signed(vec![format!("{name}.example.test")])
        .expect("generate cert");
    cert.serialize_pem().expect("cert pem")
}

/// A candidates directory and a state directory under one temp root.
pub struct Layout {
    pub root: TempDir,
}

impl Layout {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join("certs")).expect("certs dir");
        Self { root }
    }

    /// Layout whose candidates directory was never created.
    pub fn without_certs_dir() -> Self {
        Self {
            root: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.root.path().join("certs")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.path().join("state")
    }

    pub fn config(&self) -> ve::domain::types::MergerConfig {
        ve::domain::types::MergerConfig::with_dirs(self.certs_dir(), self.state_dir())
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        write_file(&self.certs_dir(), name, contents)
    }

    pub fn write_valid(&self, name: &str) -> PathBuf {
        self.write(name, generate_cert_pem(name))
    }

    pub fn fingerprint_file(&self) -> PathBuf {
        self.state_dir().join(ve::MergerDefaults::FINGERPRINT_FILE)
    }

    pub fn keystore_file(&self) -> PathBuf {
        self.state_dir().join(ve::MergerDefaults::KEYSTORE_FILE)
    }

    pub fn pem_bundle_file(&self) -> PathBuf {
        self.state_dir().join(ve::MergerDefaults::PEM_BUNDLE_FILE)
    }
}

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("parent dir");
    }
    std::fs::write(&path, contents).expect("write file");
    path
}

/// Aliases stored in a JKS file written with the default password.
pub fn keystore_aliases(path: &Path) -> Vec<String> {
    let bytes = std::fs::read(path).expect("read keystore");
    let material = ve::adapters::decode_jks(&bytes, ve::MergerDefaults::KEYSTORE_PASSWORD)
        .expect("decode keystore");
    material.aliases().map(str::to_string).collect()
}

/// Number of certificate blocks in a PEM bundle.
pub fn pem_cert_count(path: &Path) -> usize {
    let bytes = std::fs::read(path).expect("read bundle");
    openssl::x509::X509::stack_from_pem(&bytes).expect("parse bundle").len()
}
