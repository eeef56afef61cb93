//! Encrypted note CRUD
//!
//! Each note gets its own random key. The note key is wrapped under the
//! vault master key and encrypts the `{title, text}` payload. Edits reuse the
//! existing note key.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use nv_core::{Note, NvError, NvResult};
use nv_crypto::{encrypt_struct, generate_symmetric_key, unwrap_key, wrap_key, Envelope, SymmetricKey};
use nv_storage::{valid_key, Keyed, KvStore, Partition};

use crate::session::MasterKey;

/// Note record format version
pub const NOTE_CRYPTO_VERSION: u32 = 1;

/// A note as persisted. Holds no plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedNoteRecord {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub crypto_version: u32,
    /// `{title, text}` under the note key
    pub payload: Envelope,
    /// Note key under the master key
    pub wrapped_note_key: Envelope,
}

impl Keyed for EncryptedNoteRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct NotePayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
}

/// A stored note that could not be decrypted
#[derive(Debug)]
pub struct UnreadableNote {
    pub id: String,
    pub error: NvError,
}

/// Result of [`NoteStore::list_notes`]
#[derive(Debug, Default)]
pub struct NoteListing {
    /// Most recently modified first
    pub notes: Vec<Note>,
    /// Records skipped because they failed to decode or decrypt
    pub unreadable: Vec<UnreadableNote>,
}

#[derive(Debug, Clone)]
pub struct NoteStore {
    store: KvStore,
}

impl NoteStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Decrypt every note.
    ///
    /// A record that fails to decrypt is reported in
    /// [`NoteListing::unreadable`] and does not hide the others.
    pub async fn list_notes(&self, master: &MasterKey) -> NvResult<NoteListing> {
        let scanned = self.store.scan::<EncryptedNoteRecord>(Partition::Notes).await?;

        let key = master.key().clone();
        let opened: Vec<(String, NvResult<Note>)> = tokio::task::spawn_blocking(move || {
            scanned
                .into_par_iter()
                .map(|(id, record)| {
                    let note = record.and_then(|rec| open_note(&key, &rec));
                    (id, note)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| NvError::Crypto(format!("note decryption task failed: {e}")))?;

        let mut listing = NoteListing::default();
        for (id, note) in opened {
            match note {
                Ok(note) => listing.notes.push(note),
                Err(error) => {
                    warn!(id = %id, error = %error, "skipping unreadable note");
                    listing.unreadable.push(UnreadableNote { id, error });
                }
            }
        }
        listing.notes.sort_by(newest_first);

        debug!(
            notes = listing.notes.len(),
            unreadable = listing.unreadable.len(),
            "listed notes"
        );
        Ok(listing)
    }

    /// Decrypt one note. `None` when absent.
    pub async fn get_note(&self, master: &MasterKey, id: &str) -> NvResult<Option<Note>> {
        match self.get_record(id).await? {
            Some(record) => open_note(master.key(), &record).map(Some),
            None => Ok(None),
        }
    }

    /// Store a new note under a fresh note key.
    pub async fn add_note(&self, master: &MasterKey, title: &str, text: &str) -> NvResult<Note> {
        let note_key = generate_symmetric_key();
        let now = now_millis();
        let record = EncryptedNoteRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            crypto_version: NOTE_CRYPTO_VERSION,
            payload: seal_payload(&note_key, title, text)?,
            wrapped_note_key: wrap_key(master.key(), &note_key)?,
        };
        self.store.put(Partition::Notes, &record).await?;

        debug!(id = %record.id, "note added");
        Ok(note_from(&record, title, text))
    }

    /// Re-encrypt a note's content under its existing note key.
    ///
    /// Returns `None` without writing anything when `id` does not exist.
    /// `updated_at` always moves forward, even within the same millisecond.
    pub async fn update_note(
        &self,
        master: &MasterKey,
        id: &str,
        title: &str,
        text: &str,
    ) -> NvResult<Option<Note>> {
        let Some(existing) = self.get_record(id).await? else {
            debug!(id, "update of unknown note ignored");
            return Ok(None);
        };

        let note_key = unwrap_key(master.key(), &existing.wrapped_note_key)?;
        let record = EncryptedNoteRecord {
            updated_at: now_millis().max(existing.updated_at.saturating_add(1)),
            payload: seal_payload(&note_key, title, text)?,
            ..existing
        };
        self.store.put(Partition::Notes, &record).await?;

        debug!(id, "note updated");
        Ok(Some(note_from(&record, title, text)))
    }

    /// Remove a note. Unknown ids are a no-op.
    pub async fn delete_note(&self, id: &str) -> NvResult<()> {
        if !valid_key(id) {
            return Ok(());
        }
        self.store.delete(Partition::Notes, id).await
    }

    async fn get_record(&self, id: &str) -> NvResult<Option<EncryptedNoteRecord>> {
        // Ids that could never have been issued cannot exist
        if !valid_key(id) {
            return Ok(None);
        }
        self.store.get(Partition::Notes, id).await
    }
}

fn seal_payload(note_key: &SymmetricKey, title: &str, text: &str) -> NvResult<Envelope> {
    let payload = NotePayload {
        title: title.to_string(),
        text: text.to_string(),
    };
    encrypt_struct(note_key, &payload)
}

fn open_note(master: &SymmetricKey, record: &EncryptedNoteRecord) -> NvResult<Note> {
    if record.crypto_version != NOTE_CRYPTO_VERSION {
        return Err(NvError::Serialization(format!(
            "unsupported note crypto version {}",
            record.crypto_version
        )));
    }
    let note_key = unwrap_key(master, &record.wrapped_note_key)?;
    let payload: NotePayload = record.payload.open_struct(&note_key)?;
    Ok(note_from(record, &payload.title, &payload.text))
}

fn note_from(record: &EncryptedNoteRecord, title: &str, text: &str) -> Note {
    Note {
        id: record.id.clone(),
        title: title.to_string(),
        text: text.to_string(),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn newest_first(a: &Note, b: &Note) -> Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
