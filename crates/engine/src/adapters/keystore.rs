// adapters/keystore.rs
//
// Java KeyStore (JKS) encoding. Layout:
//   u32 magic FEEDFEED, u32 version, u32 entry count, entries..., 20-byte
//   SHA-1 over (password as UTF-16BE || "Mighty Aphrodite" || everything before it).
// Strings are Java modified UTF-8 with a u16 length prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use openssl::pkcs12::Pkcs12;
use openssl::sha::Sha1;
use openssl::x509::X509;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::trust_writer::TrustStoreWriter;
use crate::domain::types::{MergerDefaults, TrustMaterial};

const MAGIC: u32 = 0xFEED_FEED;
const VERSION_1: u32 = 1;
const VERSION_2: u32 = 2;
const TAG_PRIVATE_KEY: u32 = 1;
const TAG_TRUSTED_CERT: u32 = 2;
const WHITENER: &[u8] = b"Mighty Aphrodite";
const CERT_TYPE: &str = "X.509";
const DIGEST_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum KeyStoreError {
  #[error("not a JKS key store")]
  BadMagic,
  #[error("unsupported JKS version {0}")]
  UnsupportedVersion(u32),
  #[error("unknown entry tag {0}")]
  UnknownTag(u32),
  #[error("key store is truncated")]
  Truncated,
  #[error("key store integrity check failed (wrong password or corrupted file)")]
  IntegrityCheckFailed,
  #[error("string too long for modified UTF-8 ({0} bytes)")]
  StringTooLong(usize),
  #[error("invalid modified UTF-8 string")]
  InvalidString,
  #[error("unsupported certificate type {0}")]
  UnsupportedCertType(String),
  #[error(transparent)]
  Certificate(#[from] openssl::error::ErrorStack),
}

/// Writes merged trust material as a JKS trust store for the JVM.
pub struct KeyStoreWriter {
  password: Zeroizing<String>,
  file_name: String,
}

impl KeyStoreWriter {
  pub fn new(password: Zeroizing<String>) -> Self {
    Self {
      password,
      file_name: MergerDefaults::KEYSTORE_FILE.to_string(),
    }
  }

  pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
    self.file_name = name.into();
    self
  }

  /// JVM system properties that point the default SSL context at `path`.
  pub fn trust_store_properties(&self, path: &std::path::Path) -> Vec<(String, String)> {
    vec![
      ("javax.net.ssl.trustStore".to_string(), path.display().to_string()),
      ("javax.net.ssl.trustStorePassword".to_string(), self.password.as_str().to_string()),
      ("javax.net.ssl.trustStoreType".to_string(), "JKS".to_string()),
    ]
  }
}

impl TrustStoreWriter for KeyStoreWriter {
  fn file_name(&self) -> &str {
    &self.file_name
  }

  fn render(&self, material: &TrustMaterial) -> EngineResult<Vec<u8>> {
    encode_jks(material, &self.password, now_millis())
      .map_err(|e| EngineError::Encode(e.to_string()))
  }

  /// Accepts JKS, and falls back to PKCS#12 for JDK 18+ `cacerts`.
  fn load(&self, bytes: &[u8]) -> EngineResult<TrustMaterial> {
    let material = if bytes.len() >= 4 && bytes[..4] == MAGIC.to_be_bytes() {
      decode_jks(bytes, &self.password).map_err(|e| EngineError::Decode(e.to_string()))?
    } else {
      load_pkcs12(bytes, &self.password)?
    };
    Ok(material.namespaced(MergerDefaults::BASE_ALIAS_PREFIX))
  }

  /// Stored entries after case folding and chain expansion.
  fn entry_count(&self, material: &TrustMaterial) -> usize {
    stored_certificates(material)
      .map(|(name, _)| name)
      .collect::<BTreeSet<_>>()
      .len()
  }
}

/// Entries as stored: aliases lowercased the way the JVM does, extra
/// certificates from one file stored as `alias-2`, `alias-3`, ...
/// Later aliases in sort order win a lowercase collision.
pub fn keystore_entries(material: &TrustMaterial) -> Result<BTreeMap<String, Vec<u8>>, KeyStoreError> {
  let mut entries = BTreeMap::new();
  for (name, cert) in stored_certificates(material) {
    entries.insert(name, cert.to_der()?);
  }
  Ok(entries)
}

fn stored_certificates(material: &TrustMaterial) -> impl Iterator<Item = (String, &X509)> {
  material.iter().flat_map(|(alias, certs)| {
    let alias = alias.to_lowercase();
    certs.iter().enumerate().map(move |(i, cert)| {
      let name = if i == 0 { alias.clone() } else { format!("{alias}-{}", i + 1) };
      (name, cert)
    })
  })
}

pub fn encode_jks(material: &TrustMaterial, password: &str, timestamp_ms: u64) -> Result<Vec<u8>, KeyStoreError> {
  let entries = keystore_entries(material)?;
  let mut out = Vec::new();
  put_u32(&mut out, MAGIC);
  put_u32(&mut out, VERSION_2);
  put_u32(&mut out, entries.len() as u32);
  for (alias, der) in &entries {
    put_u32(&mut out, TAG_TRUSTED_CERT);
    put_utf(&mut out, alias)?;
    out.extend_from_slice(&timestamp_ms.to_be_bytes());
    put_utf(&mut out, CERT_TYPE)?;
    put_u32(&mut out, der.len() as u32);
    out.extend_from_slice(der);
  }
  let digest = integrity_digest(password, &out);
  out.extend_from_slice(&digest);
  Ok(out)
}

/// Trusted-certificate entries of a JKS file. Private-key entries are
/// skipped; only trust anchors matter here.
pub fn decode_jks(bytes: &[u8], password: &str) -> Result<TrustMaterial, KeyStoreError> {
  if bytes.len() < 12 + DIGEST_LEN {
    return Err(KeyStoreError::Truncated);
  }
  let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);
  if integrity_digest(password, body).as_slice() != digest {
    return Err(KeyStoreError::IntegrityCheckFailed);
  }

  let mut r = Reader { buf: body, pos: 0 };
  if r.u32()? != MAGIC {
    return Err(KeyStoreError::BadMagic);
  }
  let version = r.u32()?;
  if version != VERSION_1 && version != VERSION_2 {
    return Err(KeyStoreError::UnsupportedVersion(version));
  }

  let count = r.u32()?;
  let mut material = TrustMaterial::new();
  for _ in 0..count {
    match r.u32()? {
      TAG_PRIVATE_KEY => {
        r.utf()?;
        r.take(8)?;
        let key_len = r.u32()? as usize;
        r.take(key_len)?;
        let chain_len = r.u32()?;
        for _ in 0..chain_len {
          if version == VERSION_2 {
            r.utf()?;
          }
          let len = r.u32()? as usize;
          r.take(len)?;
        }
      }
      TAG_TRUSTED_CERT => {
        let alias = r.utf()?;
        r.take(8)?;
        if version == VERSION_2 {
          let cert_type = r.utf()?;
          if cert_type != CERT_TYPE {
            return Err(KeyStoreError::UnsupportedCertType(cert_type));
          }
        }
        let len = r.u32()? as usize;
        let cert = X509::from_der(r.take(len)?)?;
        material.insert(alias, vec![cert]);
      }
      other => return Err(KeyStoreError::UnknownTag(other)),
    }
  }
  Ok(material)
}

fn load_pkcs12(bytes: &[u8], password: &str) -> EngineResult<TrustMaterial> {
  let parsed = Pkcs12::from_der(bytes)?.parse2(password)?;
  let mut material = TrustMaterial::new();
  let certs = parsed.cert.into_iter().chain(parsed.ca.into_iter().flatten());
  for (i, cert) in certs.enumerate() {
    let alias = cert
      .alias()
      .map(|a| String::from_utf8_lossy(a).into_owned())
      .unwrap_or_else(|| format!("{i:04}"));
    material.insert(alias, vec![cert]);
  }
  Ok(material)
}

fn integrity_digest(password: &str, body: &[u8]) -> [u8; DIGEST_LEN] {
  let mut h = Sha1::new();
  for unit in password.encode_utf16() {
    h.update(&unit.to_be_bytes());
  }
  h.update(WHITENER);
  h.update(body);
  h.finish()
}

fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
  out.extend_from_slice(&v.to_be_bytes());
}

/// `DataOutputStream.writeUTF`: UTF-16 units, NUL as two bytes, surrogates
/// encoded individually.
fn put_utf(out: &mut Vec<u8>, s: &str) -> Result<(), KeyStoreError> {
  let mut encoded = Vec::with_capacity(s.len());
  for unit in s.encode_utf16() {
    match unit {
      0x0001..=0x007F => encoded.push(unit as u8),
      0x0080..=0x07FF | 0x0000 => {
        encoded.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
        encoded.push(0x80 | (unit & 0x3F) as u8);
      }
      _ => {
        encoded.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
        encoded.push(0x80 | ((unit >> 6) & 0x3F) as u8);
        encoded.push(0x80 | (unit & 0x3F) as u8);
      }
    }
  }
  let len = u16::try_from(encoded.len()).map_err(|_| KeyStoreError::StringTooLong(encoded.len()))?;
  out.extend_from_slice(&len.to_be_bytes());
  out.extend_from_slice(&encoded);
  Ok(())
}

struct Reader<'a> {
  buf: &'a [u8],
  pos: usize,
}

impl<'a> Reader<'a> {
  fn take(&mut self, n: usize) -> Result<&'a [u8], KeyStoreError> {
    let buf = self.buf;
    let end = self.pos.checked_add(n).ok_or(KeyStoreError::Truncated)?;
    let slice = buf.get(self.pos..end).ok_or(KeyStoreError::Truncated)?;
    self.pos = end;
    Ok(slice)
  }

  fn u32(&mut self) -> Result<u32, KeyStoreError> {
    let b = self.take(4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
  }

  fn utf(&mut self) -> Result<String, KeyStoreError> {
    let len_bytes = self.take(2)?;
    let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let raw = self.take(len)?;
    let mut units = Vec::with_capacity(len);
    let mut i = 0;
    while i < raw.len() {
      let b = raw[i] as u16;
      let cont = |j: usize| -> Result<u16, KeyStoreError> {
        match raw.get(j) {
          Some(c) if c & 0xC0 == 0x80 => Ok((c & 0x3F) as u16),
          _ => Err(KeyStoreError::InvalidString),
        }
      };
      if b & 0x80 == 0 {
        units.push(b);
        i += 1;
      } else if b & 0xE0 == 0xC0 {
        units.push(((b & 0x1F) << 6) | cont(i + 1)?);
        i += 2;
      } else if b & 0xF0 == 0xE0 {
        units.push(((b & 0x0F) << 12) | (cont(i + 1)? << 6) | cont(i + 2)?);
        i += 3;
      } else {
        return Err(KeyStoreError::InvalidString);
      }
    }
    String::from_utf16(&units).map_err(|_| KeyStoreError::InvalidString)
  }
}
