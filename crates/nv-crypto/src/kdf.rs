//! Key derivation: PBKDF2-HMAC-SHA256 secret → key-encryption key

use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use nv_core::{NvError, NvResult};

use crate::keys::SymmetricKey;
use crate::{KEY_SIZE, SALT_SIZE};

/// Derive a 256-bit key from a low-entropy secret.
///
/// Deterministic for fixed inputs. Runtime grows linearly with `iterations`;
/// at production counts this takes tens to hundreds of milliseconds, so async
/// callers should run it on a blocking thread.
pub fn derive_key_from_secret(
    secret: &SecretString,
    salt: &[u8],
    iterations: u32,
) -> NvResult<SymmetricKey> {
    if iterations == 0 {
        return Err(NvError::Crypto("PBKDF2 iteration count must be at least 1".into()));
    }
    if salt.is_empty() {
        return Err(NvError::Crypto("PBKDF2 salt must not be empty".into()));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.expose_secret().as_bytes(),
        salt,
        iterations,
        &mut key,
    );

    Ok(SymmetricKey::from_bytes(key))
}

/// Fresh random salt for one credential path.
pub fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
