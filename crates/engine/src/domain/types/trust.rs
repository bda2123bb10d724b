use std::collections::BTreeMap;

use openssl::x509::X509;

/// Merged trust material: alias to the certificates stored under it.
/// Rebuilt from scratch on every import; never edited in place on disk.
#[derive(Debug, Clone, Default)]
pub struct TrustMaterial {
    entries: BTreeMap<String, Vec<X509>>,
}

impl TrustMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins. Returns the entry that was replaced, if any.
    pub fn insert(&mut self, alias: impl Into<String>, certs: Vec<X509>) -> Option<Vec<X509>> {
        self.entries.insert(alias.into(), certs)
    }

    pub fn get(&self, alias: &str) -> Option<&[X509]> {
        self.entries.get(alias).map(Vec::as_slice)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Same entries with every alias prefixed by `prefix`.
    pub fn namespaced(self, prefix: &str) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(alias, certs)| (format!("{prefix}{alias}"), certs))
                .collect(),
        }
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total certificates across all aliases.
    pub fn certificate_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[X509])> {
        self.entries.iter().map(|(alias, certs)| (alias.as_str(), certs.as_slice()))
    }
}
