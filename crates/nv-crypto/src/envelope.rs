//! Persisted form of one authenticated encryption: `{iv, ct}` as base64.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use nv_core::{NvError, NvResult};

use crate::aead::{auth_decrypt, auth_encrypt};
use crate::encoding::{b64_to_bytes, bytes_to_b64};
use crate::keys::SymmetricKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// 96-bit nonce (base64)
    pub iv: String,
    /// Ciphertext with trailing GCM tag (base64)
    pub ct: String,
}

impl Envelope {
    /// Encrypt raw bytes into a new envelope.
    pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> NvResult<Self> {
        let sealed = auth_encrypt(key, plaintext)?;
        Ok(Self {
            iv: bytes_to_b64(&sealed.iv),
            ct: bytes_to_b64(&sealed.ciphertext),
        })
    }

    /// Decrypt back to raw bytes.
    ///
    /// Undecodable base64 is reported as [`NvError::Authentication`]: a
    /// damaged envelope is indistinguishable from a wrong key.
    pub fn open(&self, key: &SymmetricKey) -> NvResult<Vec<u8>> {
        let iv = b64_to_bytes(&self.iv).map_err(|_| NvError::Authentication)?;
        let ct = b64_to_bytes(&self.ct).map_err(|_| NvError::Authentication)?;
        auth_decrypt(key, &iv, &ct)
    }

    pub fn open_struct<T: DeserializeOwned>(&self, key: &SymmetricKey) -> NvResult<T> {
        let plaintext = Zeroizing::new(self.open(key)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Serialize `value` to JSON and encrypt it.
pub fn encrypt_struct<T: Serialize>(key: &SymmetricKey, value: &T) -> NvResult<Envelope> {
    let json = Zeroizing::new(serde_json::to_vec(value)?);
    Envelope::seal(key, &json)
}

/// Decrypt and deserialize a value produced by [`encrypt_struct`].
pub fn decrypt_struct<T: DeserializeOwned>(
    key: &SymmetricKey,
    iv_b64: &str,
    ct_b64: &str,
) -> NvResult<T> {
    Envelope {
        iv: iv_b64.to_string(),
        ct: ct_b64.to_string(),
    }
    .open_struct(key)
}
