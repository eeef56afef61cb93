//! Symmetric keys: generation, raw import/export, and key wrapping

use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use nv_core::{NvError, NvResult};

use crate::envelope::Envelope;
use crate::KEY_SIZE;

/// A 256-bit AES-GCM key. Zeroized on drop.
///
/// Used for KEKs, the vault master key, and per-note keys alike; the
/// difference is only in what it protects.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit key.
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    SymmetricKey::from_bytes(bytes)
}

/// Raw key material, for moving a key across a wrap boundary only.
pub fn export_key_bytes(key: &SymmetricKey) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(key.as_bytes().to_vec())
}

/// Rebuild a key from raw material produced by [`export_key_bytes`].
pub fn import_key_bytes(raw: &[u8]) -> NvResult<SymmetricKey> {
    if raw.len() != KEY_SIZE {
        return Err(NvError::Crypto(format!(
            "key has wrong size: {} bytes (expected {KEY_SIZE})",
            raw.len()
        )));
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(raw);
    Ok(SymmetricKey::from_bytes(bytes))
}

/// Wrap (encrypt) `key` under `kek`.
pub fn wrap_key(kek: &SymmetricKey, key: &SymmetricKey) -> NvResult<Envelope> {
    Envelope::seal(kek, key.as_bytes())
}

/// Unwrap (decrypt) a key produced by [`wrap_key`].
pub fn unwrap_key(kek: &SymmetricKey, wrapped: &Envelope) -> NvResult<SymmetricKey> {
    let raw = Zeroizing::new(wrapped.open(kek)?);
    import_key_bytes(&raw)
}
