// adapters/pem_bundle.rs

use openssl::x509::X509;

use crate::domain::error::EngineResult;
use crate::domain::trust_writer::TrustStoreWriter;
use crate::domain::types::{MergerDefaults, TrustMaterial};

/// Flat concatenated PEM bundle, as read by OpenSSL (`SSL_CERT_FILE`,
/// `REQUESTS_CA_BUNDLE`) and Node (`NODE_EXTRA_CA_CERTS`).
///
/// Certificates are re-encoded from the parsed X.509, so nothing but
/// certificate blocks from a candidate file ever reaches the bundle. Each
/// entry is preceded by a `# <alias>` comment line, which PEM readers skip.
pub struct PemBundleWriter {
  file_name: String,
}

impl Default for PemBundleWriter {
  fn default() -> Self {
    Self::new()
  }
}

impl PemBundleWriter {
  pub fn new() -> Self {
    Self {
      file_name: MergerDefaults::PEM_BUNDLE_FILE.to_string(),
    }
  }

  pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
    self.file_name = name.into();
    self
  }
}

impl TrustStoreWriter for PemBundleWriter {
  fn file_name(&self) -> &str {
    &self.file_name
  }

  fn render(&self, material: &TrustMaterial) -> EngineResult<Vec<u8>> {
    let mut out = Vec::new();
    for (alias, certs) in material.iter() {
      out.extend_from_slice(format!("# {}\n", alias.replace(['\r', '\n'], " ")).as_bytes());
      for cert in certs {
        out.extend_from_slice(&cert.to_pem()?);
      }
    }
    Ok(out)
  }

  /// A system CA bundle carries no aliases; entries are numbered in file order.
  fn load(&self, bytes: &[u8]) -> EngineResult<TrustMaterial> {
    let mut material = TrustMaterial::new();
    for (i, cert) in X509::stack_from_pem(bytes)?.into_iter().enumerate() {
      material.insert(format!("{}{i:04}", MergerDefaults::BASE_ALIAS_PREFIX), vec![cert]);
    }
    Ok(material)
  }

  /// Certificate blocks in the bundle.
  fn entry_count(&self, material: &TrustMaterial) -> usize {
    material.certificate_count()
  }
}
