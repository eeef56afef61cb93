//! The single persisted vault record: the master key wrapped twice, once
//! per credential.

use serde::{Deserialize, Serialize};

use nv_core::{NvError, NvResult};
use nv_crypto::Envelope;
use nv_storage::{Keyed, KvStore, Partition};

/// Fixed id of the one vault record
pub const VAULT_RECORD_ID: &str = "default";

/// Vault record format version
pub const VAULT_RECORD_VERSION: u32 = 1;

/// Which credential unlocks the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Passphrase,
    RecoveryKey,
}

impl Credential {
    pub fn as_str(&self) -> &'static str {
        match self {
            Credential::Passphrase => "passphrase",
            Credential::RecoveryKey => "recovery-key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub id: String,
    pub version: u32,

    /// KDF salt for the passphrase path (base64)
    pub pass_salt: String,
    pub pass_iterations: u32,
    /// Master key under the passphrase-derived KEK
    pub wrapped_vault_by_pass: Envelope,

    /// KDF salt for the recovery path (base64)
    pub rec_salt: String,
    pub rec_iterations: u32,
    /// The same master key under the recovery-key-derived KEK
    pub wrapped_vault_by_rec: Envelope,
}

/// The (salt, iterations, envelope) triplet for one credential
#[derive(Debug, Clone, Copy)]
pub struct CredentialPath<'a> {
    pub salt: &'a str,
    pub iterations: u32,
    pub wrapped: &'a Envelope,
}

impl VaultRecord {
    pub fn credential_path(&self, credential: Credential) -> CredentialPath<'_> {
        match credential {
            Credential::Passphrase => CredentialPath {
                salt: &self.pass_salt,
                iterations: self.pass_iterations,
                wrapped: &self.wrapped_vault_by_pass,
            },
            Credential::RecoveryKey => CredentialPath {
                salt: &self.rec_salt,
                iterations: self.rec_iterations,
                wrapped: &self.wrapped_vault_by_rec,
            },
        }
    }
}

impl Keyed for VaultRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Pass-through persistence of the vault record
#[derive(Debug, Clone)]
pub struct VaultRecordStore {
    store: KvStore,
}

impl VaultRecordStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// `None` means no vault has been set up yet.
    pub async fn get_vault_record(&self) -> NvResult<Option<VaultRecord>> {
        let record: Option<VaultRecord> =
            self.store.get(Partition::Vault, VAULT_RECORD_ID).await?;
        match record {
            Some(rec) if rec.version != VAULT_RECORD_VERSION => Err(NvError::Crypto(format!(
                "unsupported vault record version {} (expected {VAULT_RECORD_VERSION})",
                rec.version
            ))),
            other => Ok(other),
        }
    }

    pub async fn put_vault_record(&self, record: &VaultRecord) -> NvResult<()> {
        self.store.put(Partition::Vault, record).await
    }
}
