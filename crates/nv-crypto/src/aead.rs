//! AES-256-GCM authenticated encryption
//!
//! Each call draws a fresh random 96-bit nonce from the OS CSPRNG. No
//! associated data is bound, which keeps records readable by the WebCrypto
//! client that shares the format.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use nv_core::{NvError, NvResult};

use crate::keys::SymmetricKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Output of one encryption: the nonce and `ciphertext || tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under `key` with a fresh nonce.
pub fn auth_encrypt(key: &SymmetricKey, plaintext: &[u8]) -> NvResult<Sealed> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut iv = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| NvError::Crypto(format!("encryption failed: {e}")))?;

    Ok(Sealed { iv, ciphertext })
}

/// Decrypt and verify. Any failure, including a malformed nonce, is
/// [`NvError::Authentication`].
pub fn auth_decrypt(key: &SymmetricKey, iv: &[u8], ciphertext: &[u8]) -> NvResult<Vec<u8>> {
    if iv.len() != NONCE_SIZE || ciphertext.len() < TAG_SIZE {
        return Err(NvError::Authentication);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| NvError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_symmetric_key;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = generate_symmetric_key();

        let sealed = auth_encrypt(&key, b"").unwrap();
        let decrypted = auth_decrypt(&key, &sealed.iv, &sealed.ciphertext).unwrap();

        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = generate_symmetric_key();
        let key2 = generate_symmetric_key();

        let sealed = auth_encrypt(&key1, b"secret data").unwrap();
        let result = auth_decrypt(&key2, &sealed.iv, &sealed.ciphertext);

        assert!(matches!(result, Err(NvError::Authentication)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let key = generate_symmetric_key();

        let mut sealed = auth_encrypt(&key, b"secret data").unwrap();
        sealed.ciphertext[0] ^= 0xFF;

        let result = auth_decrypt(&key, &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(NvError::Authentication)));
    }

    #[test]
    fn test_tampered_iv() {
        let key = generate_symmetric_key();

        let mut sealed = auth_encrypt(&key, b"secret data").unwrap();
        sealed.iv[0] ^= 0x01;

        let result = auth_decrypt(&key, &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(NvError::Authentication)));
    }

    #[test]
    fn test_malformed_iv_is_authentication_failure() {
        let key = generate_symmetric_key();
        let sealed = auth_encrypt(&key, b"secret data").unwrap();

        let result = auth_decrypt(&key, &sealed.iv[..8], &sealed.ciphertext);
        assert!(matches!(result, Err(NvError::Authentication)));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = generate_symmetric_key();
        let result = auth_decrypt(&key, &[0u8; NONCE_SIZE], &[0u8; 4]);
        assert!(matches!(result, Err(NvError::Authentication)));
    }

    #[test]
    fn test_encrypted_size() {
        let key = generate_symmetric_key();
        let sealed = auth_encrypt(&key, &[0u8; 1000]).unwrap();

        // plaintext (1000) + tag (16)
        assert_eq!(sealed.ciphertext.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_nonce_never_repeats() {
        let key = generate_symmetric_key();
        let mut seen = HashSet::with_capacity(10_000);

        for _ in 0..10_000 {
            let sealed = auth_encrypt(&key, b"same plaintext").unwrap();
            assert!(seen.insert(sealed.iv), "nonce reused");
        }
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let key = generate_symmetric_key();
            let sealed = auth_encrypt(&key, &payload).unwrap();
            let opened = auth_decrypt(&key, &sealed.iv, &sealed.ciphertext).unwrap();
            prop_assert_eq!(opened, payload);
        }
    }
}
