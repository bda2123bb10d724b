// crates/engine/src/domain/trust_writer.rs

use super::error::EngineResult;
use super::types::TrustMaterial;

/// Output-format strategy for merged trust material. One implementation per
/// runtime TLS stack (Java key store today, flat PEM bundle for OpenSSL and
/// Node consumers).
pub trait TrustStoreWriter: Send + Sync {
    /// File name of the artifact under the state directory.
    fn file_name(&self) -> &str;

    /// Serialize the whole material; the result replaces any prior file.
    fn render(&self, material: &TrustMaterial) -> EngineResult<Vec<u8>>;

    /// Parse an artifact in this writer's format, used for base trust.
    /// Aliases come back under [`MergerDefaults::BASE_ALIAS_PREFIX`].
    ///
    /// [`MergerDefaults::BASE_ALIAS_PREFIX`]: super::types::MergerDefaults::BASE_ALIAS_PREFIX
    fn load(&self, bytes: &[u8]) -> EngineResult<TrustMaterial>;

    /// Entries the runtime will see once `material` is rendered.
    fn entry_count(&self, material: &TrustMaterial) -> usize {
        material.len()
    }
}
