//! Recovery key generation
//!
//! At vault setup a random recovery key is generated and shown to the user
//! exactly once. It is never stored; it only feeds the KDF that wraps the
//! second copy of the master key.

use rand::RngCore;
use secrecy::SecretString;

use crate::encoding::bytes_to_b64url;
use crate::RECOVERY_KEY_BYTES;

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Random URL-safe token carrying `byte_len` bytes of entropy.
pub fn random_token(byte_len: usize) -> String {
    bytes_to_b64url(&random_bytes(byte_len))
}

/// Generate a recovery key with the default entropy (24 bytes, 32 chars).
pub fn generate_recovery_key() -> SecretString {
    generate_recovery_key_with(RECOVERY_KEY_BYTES)
}

pub fn generate_recovery_key_with(byte_len: usize) -> SecretString {
    SecretString::from(random_token(byte_len))
}
