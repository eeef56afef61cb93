//! nv-crypto: client-side encryption primitives for notevault
//!
//! Key hierarchy:
//! ```text
//! Passphrase ──PBKDF2-SHA256(passSalt, passIterations)──► KEK ─┐
//!                                                             ├─ wraps ─► Master Key (256-bit random)
//! Recovery key ─PBKDF2-SHA256(recSalt, recIterations)──► KEK ─┘               │
//!                                                                 wraps ─► Note Key (per note, 256-bit random)
//!                                                                                 │
//!                                                              AES-256-GCM ─► {title, text} payload
//! ```
//!
//! Every encryption draws a fresh 96-bit nonce. Stored binary fields are
//! standard base64.

pub mod aead;
pub mod encoding;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod recovery;

pub use aead::{auth_decrypt, auth_encrypt, Sealed};
pub use encoding::{b64_to_bytes, b64url_to_bytes, bytes_to_b64, bytes_to_b64url};
pub use envelope::{decrypt_struct, encrypt_struct, Envelope};
pub use kdf::{derive_key_from_secret, random_salt};
pub use keys::{
    export_key_bytes, generate_symmetric_key, import_key_bytes, unwrap_key, wrap_key,
    SymmetricKey,
};
pub use recovery::{generate_recovery_key, generate_recovery_key_with, random_bytes, random_token};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a per-credential KDF salt
pub const SALT_SIZE: usize = 16;

/// Default PBKDF2 iteration count for both credential paths
pub const DEFAULT_ITERATIONS: u32 = 250_000;

/// Random bytes behind a generated recovery key
pub const RECOVERY_KEY_BYTES: usize = 24;
