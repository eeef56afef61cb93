//! nv-vault: vault lifecycle and encrypted note storage for notevault
//!
//! [`VaultSession`] owns the master key for one application session.
//! [`NoteStore`] takes that key by reference for every operation.

pub mod marker;
pub mod notes;
pub mod record;
pub mod session;

pub use marker::VaultMarker;
pub use notes::{now_millis, EncryptedNoteRecord, NoteListing, NoteStore, UnreadableNote};
pub use record::{Credential, VaultRecord, VaultRecordStore, VAULT_RECORD_ID};
pub use session::{MasterKey, VaultSession, VaultSettings};

use nv_core::config::{expand_tilde, NvConfig, VaultConfig};
use nv_core::NvResult;
use nv_storage::{build_operator, KvStore};

/// Wire a session and note store to the configured backend.
pub fn open(config: &NvConfig) -> NvResult<(VaultSession, NoteStore)> {
    let store = KvStore::new(build_operator(&config.storage)?);
    Ok(open_store(store, &config.vault))
}

/// Wire a session and note store to an existing store.
pub fn open_store(store: KvStore, vault: &VaultConfig) -> (VaultSession, NoteStore) {
    let mut session = VaultSession::new(
        VaultRecordStore::new(store.clone()),
        VaultSettings::from(vault),
    );
    if let Some(path) = &vault.marker_file {
        session = session.with_marker(VaultMarker::new(expand_tilde(path)));
    }
    (session, NoteStore::new(store))
}
