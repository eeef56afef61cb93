//! Vault lifecycle state machine
//!
//! ```text
//!   checking ──refresh──► needs-setup ──setup_vault──► unlocked
//!       │                                               ▲   │
//!       └────refresh────► locked ──unlock_with_*────────┘   │
//!                           ▲                               │
//!                           └────────────lock───────────────┘
//! ```
//!
//! The session owns the only live copy of the unwrapped master key. Note
//! operations borrow it through [`VaultSession::master_key`], so the key
//! cannot be dropped by [`VaultSession::lock`] while a borrow is in flight.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use nv_core::config::VaultConfig;
use nv_core::{NvError, NvResult, VaultStatus};
use nv_crypto::{
    b64_to_bytes, bytes_to_b64, derive_key_from_secret, encrypt_struct, generate_recovery_key_with,
    generate_symmetric_key, import_key_bytes, random_salt, SymmetricKey, DEFAULT_ITERATIONS,
    RECOVERY_KEY_BYTES,
};

use crate::marker::VaultMarker;
use crate::record::{Credential, VaultRecord, VaultRecordStore, VAULT_RECORD_ID, VAULT_RECORD_VERSION};

/// Parameters applied when a new vault is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultSettings {
    pub pass_iterations: u32,
    pub recovery_iterations: u32,
    pub recovery_key_bytes: usize,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            pass_iterations: DEFAULT_ITERATIONS,
            recovery_iterations: DEFAULT_ITERATIONS,
            recovery_key_bytes: RECOVERY_KEY_BYTES,
        }
    }
}

impl From<&VaultConfig> for VaultSettings {
    fn from(cfg: &VaultConfig) -> Self {
        Self {
            pass_iterations: cfg.pass_iterations,
            recovery_iterations: cfg.recovery_iterations,
            recovery_key_bytes: cfg.recovery_key_bytes,
        }
    }
}

/// The unwrapped vault master key. Not cloneable, not serializable.
pub struct MasterKey(SymmetricKey);

impl MasterKey {
    pub(crate) fn key(&self) -> &SymmetricKey {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Plaintext wrapped under each KEK
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct WrappedVaultKey {
    #[serde(rename = "rawVkB64")]
    raw_vk_b64: String,
}

pub struct VaultSession {
    records: VaultRecordStore,
    settings: VaultSettings,
    marker: Option<VaultMarker>,
    /// Cached after the first load; immutable once written
    record: Option<VaultRecord>,
    master: Option<MasterKey>,
    status: watch::Sender<VaultStatus>,
}

impl VaultSession {
    pub fn new(records: VaultRecordStore, settings: VaultSettings) -> Self {
        let (status, _) = watch::channel(VaultStatus::Checking);
        Self {
            records,
            settings,
            marker: None,
            record: None,
            master: None,
            status,
        }
    }

    pub fn with_marker(mut self, marker: VaultMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn status(&self) -> VaultStatus {
        *self.status.borrow()
    }

    /// Watch status transitions.
    pub fn subscribe(&self) -> watch::Receiver<VaultStatus> {
        self.status.subscribe()
    }

    pub fn is_unlocked(&self) -> bool {
        self.master.is_some()
    }

    /// Best-effort status from the marker alone, for picking a first screen.
    /// `Checking` when no marker is configured.
    pub async fn initial_guess(&self) -> VaultStatus {
        match &self.marker {
            Some(marker) if marker.is_set().await => VaultStatus::Locked,
            Some(_) => VaultStatus::NeedsSetup,
            None => VaultStatus::Checking,
        }
    }

    /// Authoritative check against the stored vault record.
    ///
    /// On a store error the current status is kept and the error returned.
    pub async fn refresh(&mut self) -> NvResult<VaultStatus> {
        let record = self.records.get_vault_record().await?;
        let next = match record {
            Some(record) => {
                self.record = Some(record);
                self.sync_marker(true).await;
                if self.master.is_some() {
                    VaultStatus::Unlocked
                } else {
                    VaultStatus::Locked
                }
            }
            None => {
                self.record = None;
                self.master = None;
                self.sync_marker(false).await;
                VaultStatus::NeedsSetup
            }
        };
        self.set_status(next);
        Ok(next)
    }

    /// Borrow the master key; `Locked` when none is held.
    pub fn master_key(&self) -> NvResult<&MasterKey> {
        self.master.as_ref().ok_or(NvError::Locked)
    }

    /// Create the vault and unlock it.
    ///
    /// Returns the recovery key. It is not stored anywhere and cannot be
    /// shown again.
    pub async fn setup_vault(&mut self, passphrase: &SecretString) -> NvResult<SecretString> {
        if self.records.get_vault_record().await?.is_some() {
            warn!("overwriting existing vault record; notes under the old master key become unreadable");
        }

        let settings = self.settings;
        let master = generate_symmetric_key();
        let recovery_key = generate_recovery_key_with(settings.recovery_key_bytes);
        let pass_salt = random_salt();
        let rec_salt = random_salt();

        let (pass_kek, rec_kek) = tokio::try_join!(
            derive_kek(passphrase, pass_salt.to_vec(), settings.pass_iterations),
            derive_kek(&recovery_key, rec_salt.to_vec(), settings.recovery_iterations),
        )?;

        let payload = WrappedVaultKey {
            raw_vk_b64: bytes_to_b64(master.as_bytes()),
        };
        let record = VaultRecord {
            id: VAULT_RECORD_ID.to_string(),
            version: VAULT_RECORD_VERSION,
            pass_salt: bytes_to_b64(&pass_salt),
            pass_iterations: settings.pass_iterations,
            wrapped_vault_by_pass: encrypt_struct(&pass_kek, &payload)?,
            rec_salt: bytes_to_b64(&rec_salt),
            rec_iterations: settings.recovery_iterations,
            wrapped_vault_by_rec: encrypt_struct(&rec_kek, &payload)?,
        };
        self.records.put_vault_record(&record).await?;

        self.record = Some(record);
        self.master = Some(MasterKey(master));
        self.set_status(VaultStatus::Unlocked);
        self.sync_marker(true).await;
        info!(
            pass_iterations = settings.pass_iterations,
            recovery_iterations = settings.recovery_iterations,
            "vault created"
        );
        Ok(recovery_key)
    }

    pub async fn unlock_with_passphrase(&mut self, passphrase: &SecretString) -> NvResult<()> {
        self.unlock(Credential::Passphrase, passphrase).await
    }

    /// Surrounding whitespace in the pasted key is ignored.
    pub async fn unlock_with_recovery_key(&mut self, recovery_key: &SecretString) -> NvResult<()> {
        let trimmed = SecretString::from(recovery_key.expose_secret().trim().to_owned());
        self.unlock(Credential::RecoveryKey, &trimmed).await
    }

    /// Drop the master key.
    pub fn lock(&mut self) {
        self.master = None;
        let next = match (self.record.is_some(), self.status()) {
            (true, _) => VaultStatus::Locked,
            (false, VaultStatus::Checking) => VaultStatus::Checking,
            (false, _) => VaultStatus::NeedsSetup,
        };
        self.set_status(next);
        info!(status = %next, "vault locked");
    }

    async fn unlock(&mut self, credential: Credential, secret: &SecretString) -> NvResult<()> {
        let record = match self.load_record().await? {
            Some(record) => record,
            None => {
                self.master = None;
                self.set_status(VaultStatus::NeedsSetup);
                self.sync_marker(false).await;
                return Err(NvError::NeedsSetup);
            }
        };

        match open_master(&record, credential, secret).await {
            Ok(key) => {
                self.master = Some(MasterKey(key));
                self.set_status(VaultStatus::Unlocked);
                self.sync_marker(true).await;
                info!(credential = credential.as_str(), "vault unlocked");
                Ok(())
            }
            Err(e) => {
                self.master = None;
                self.set_status(VaultStatus::Locked);
                match e {
                    // Unusable stored parameters or a failed derivation task
                    NvError::Crypto(_) => {
                        error!(credential = credential.as_str(), error = %e, "vault record cannot be used for unlock");
                        Err(e)
                    }
                    _ => {
                        debug!(error = %e, "unlock pipeline failed");
                        warn!(credential = credential.as_str(), "unlock failed");
                        Err(NvError::Authentication)
                    }
                }
            }
        }
    }

    async fn load_record(&mut self) -> NvResult<Option<VaultRecord>> {
        if let Some(record) = &self.record {
            return Ok(Some(record.clone()));
        }
        let record = self.records.get_vault_record().await?;
        self.record = record.clone();
        Ok(record)
    }

    fn set_status(&self, next: VaultStatus) {
        let prev = self.status.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "vault status changed");
        }
    }

    async fn sync_marker(&self, present: bool) {
        let Some(marker) = &self.marker else {
            return;
        };
        let result = if present {
            marker.set().await
        } else {
            marker.clear().await
        };
        if let Err(e) = result {
            warn!(path = %marker.path().display(), error = %e, "failed to update vault marker");
        }
    }
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSession")
            .field("status", &self.status())
            .field("has_record", &self.record.is_some())
            .field("master", &self.master)
            .finish()
    }
}

/// Run PBKDF2 off the async executor.
async fn derive_kek(secret: &SecretString, salt: Vec<u8>, iterations: u32) -> NvResult<SymmetricKey> {
    let secret = SecretString::from(secret.expose_secret().to_owned());
    tokio::task::spawn_blocking(move || derive_key_from_secret(&secret, &salt, iterations))
        .await
        .map_err(|e| NvError::Crypto(format!("key derivation task failed: {e}")))?
}

async fn open_master(
    record: &VaultRecord,
    credential: Credential,
    secret: &SecretString,
) -> NvResult<SymmetricKey> {
    let path = record.credential_path(credential);
    let salt = b64_to_bytes(path.salt)?;
    let kek = derive_kek(secret, salt, path.iterations).await?;
    let payload: WrappedVaultKey = path.wrapped.open_struct(&kek)?;
    let raw = Zeroizing::new(b64_to_bytes(&payload.raw_vk_b64)?);
    import_key_bytes(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nv_storage::{memory_operator, KvStore};

    fn fast() -> VaultSettings {
        VaultSettings {
            pass_iterations: 1_000,
            recovery_iterations: 1_000,
            recovery_key_bytes: RECOVERY_KEY_BYTES,
        }
    }

    fn session() -> VaultSession {
        let store = KvStore::new(memory_operator().unwrap());
        VaultSession::new(VaultRecordStore::new(store), fast())
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = VaultConfig {
            pass_iterations: 10,
            recovery_iterations: 20,
            recovery_key_bytes: 32,
            marker_file: None,
        };
        assert_eq!(
            VaultSettings::from(&cfg),
            VaultSettings {
                pass_iterations: 10,
                recovery_iterations: 20,
                recovery_key_bytes: 32,
            }
        );
    }

    #[test]
    fn test_starts_checking_and_locked_out() {
        let session = session();
        assert_eq!(session.status(), VaultStatus::Checking);
        assert!(matches!(session.master_key(), Err(NvError::Locked)));
    }

    #[tokio::test]
    async fn test_initial_guess_without_marker() {
        assert_eq!(session().initial_guess().await, VaultStatus::Checking);
    }

    #[tokio::test]
    async fn test_wrapped_payload_shape() {
        let mut session = session();
        let passphrase = SecretString::from("pw".to_string());
        session.setup_vault(&passphrase).await.unwrap();

        let record = session.record.clone().unwrap();
        let kek = derive_key_from_secret(
            &passphrase,
            &b64_to_bytes(&record.pass_salt).unwrap(),
            record.pass_iterations,
        )
        .unwrap();
        let json: serde_json::Value = record.wrapped_vault_by_pass.open_struct(&kek).unwrap();
        let raw = b64_to_bytes(json["rawVkB64"].as_str().unwrap()).unwrap();
        assert_eq!(&raw[..], session.master_key().unwrap().key().as_bytes());
    }

    #[tokio::test]
    async fn test_recovery_key_length_follows_settings() {
        let mut session = session();
        let recovery = session
            .setup_vault(&SecretString::from("pw".to_string()))
            .await
            .unwrap();
        // 24 bytes of unpadded base64url
        assert_eq!(recovery.expose_secret().len(), 32);
    }

    #[tokio::test]
    async fn test_salts_are_independent() {
        let mut session = session();
        session
            .setup_vault(&SecretString::from("pw".to_string()))
            .await
            .unwrap();
        let record = session.record.as_ref().unwrap();
        assert_ne!(record.pass_salt, record.rec_salt);
        assert_ne!(record.wrapped_vault_by_pass, record.wrapped_vault_by_rec);
    }

    #[test]
    fn test_master_key_debug_is_redacted() {
        let key = MasterKey(generate_symmetric_key());
        assert_eq!(format!("{key:?}"), "MasterKey([REDACTED])");
    }
}
