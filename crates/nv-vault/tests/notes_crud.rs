//! Note CRUD over an unlocked session: ordering, key continuity across
//! edits, and tolerance of unreadable records.

use nv_core::{NvError, NvResult};
use nv_storage::{memory_operator, KvStore, Partition};
use nv_vault::{EncryptedNoteRecord, NoteStore, VaultRecordStore, VaultSession, VaultSettings};
use secrecy::SecretString;

struct Fixture {
    store: KvStore,
    session: VaultSession,
    notes: NoteStore,
}

async fn unlocked() -> Fixture {
    let store = KvStore::new(memory_operator().unwrap());
    let settings = VaultSettings {
        pass_iterations: 1_000,
        recovery_iterations: 1_000,
        ..Default::default()
    };
    let mut session = VaultSession::new(VaultRecordStore::new(store.clone()), settings);
    session
        .setup_vault(&SecretString::from("correct-password".to_string()))
        .await
        .unwrap();
    let notes = NoteStore::new(store.clone());
    Fixture {
        store,
        session,
        notes,
    }
}

async fn raw_record(store: &KvStore, id: &str) -> EncryptedNoteRecord {
    store.get(Partition::Notes, id).await.unwrap().unwrap()
}

#[tokio::test]
async fn add_assigns_id_and_equal_timestamps() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();

    let note = f.notes.add_note(key, "Groceries", "milk, eggs").await.unwrap();
    assert!(uuid::Uuid::parse_str(&note.id).is_ok());
    assert_eq!(note.created_at, note.updated_at);

    let other = f.notes.add_note(key, "Groceries", "milk, eggs").await.unwrap();
    assert_ne!(note.id, other.id);
}

#[tokio::test]
async fn stored_record_holds_no_plaintext() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let note = f
        .notes
        .add_note(key, "Secret title", "secret body text")
        .await
        .unwrap();

    let raw = f
        .store
        .operator()
        .read(&format!("notes/{}.json", note.id))
        .await
        .unwrap()
        .to_vec();
    let raw = String::from_utf8(raw).unwrap();
    assert!(!raw.contains("Secret title"));
    assert!(!raw.contains("secret body text"));
    assert!(raw.contains("\"cryptoVersion\":1"));
}

#[tokio::test]
async fn get_note_present_and_absent() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let note = f.notes.add_note(key, "t", "x").await.unwrap();

    assert_eq!(f.notes.get_note(key, &note.id).await.unwrap(), Some(note));
    assert_eq!(f.notes.get_note(key, "missing").await.unwrap(), None);
    assert_eq!(f.notes.get_note(key, "../vault/default").await.unwrap(), None);
}

#[tokio::test]
async fn update_preserves_identity_and_advances_time() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let original = f.notes.add_note(key, "old", "old body").await.unwrap();
    let wrapped_before = raw_record(&f.store, &original.id).await.wrapped_note_key;

    let first = f
        .notes
        .update_note(key, &original.id, "new", "new body")
        .await
        .unwrap()
        .unwrap();
    let second = f
        .notes
        .update_note(key, &original.id, "newer", "newer body")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.id, original.id);
    assert_eq!(first.created_at, original.created_at);
    assert!(first.updated_at > original.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.created_at, original.created_at);

    let stored = f.notes.get_note(key, &original.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "newer");
    assert_eq!(stored.text, "newer body");

    // Same note key across edits
    let wrapped_after = raw_record(&f.store, &original.id).await.wrapped_note_key;
    assert_eq!(wrapped_before, wrapped_after);
}

#[tokio::test]
async fn update_at_the_largest_timestamp_saturates() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let note = f.notes.add_note(key, "t", "x").await.unwrap();

    let mut record = raw_record(&f.store, &note.id).await;
    record.updated_at = i64::MAX;
    f.store.put(Partition::Notes, &record).await.unwrap();

    let updated = f
        .notes
        .update_note(key, &note.id, "t2", "x2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.updated_at, i64::MAX);
    assert_eq!(raw_record(&f.store, &note.id).await.updated_at, i64::MAX);
    assert_eq!(f.notes.get_note(key, &note.id).await.unwrap().unwrap().text, "x2");
}

#[tokio::test]
async fn update_of_unknown_id_is_a_noop() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let kept = f.notes.add_note(key, "keep", "me").await.unwrap();

    let result = f
        .notes
        .update_note(key, "does-not-exist", "t", "x")
        .await
        .unwrap();
    assert!(result.is_none());

    let listing = f.notes.list_notes(key).await.unwrap();
    assert_eq!(listing.notes, vec![kept]);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let a = f.notes.add_note(key, "a", "").await.unwrap();
    let b = f.notes.add_note(key, "b", "").await.unwrap();

    f.notes.delete_note(&a.id).await.unwrap();
    f.notes.delete_note(&a.id).await.unwrap();
    f.notes.delete_note("never-existed").await.unwrap();
    f.notes.delete_note("not a valid id/..").await.unwrap();

    let listing = f.notes.list_notes(key).await.unwrap();
    assert_eq!(listing.notes, vec![b]);
}

#[tokio::test]
async fn edited_note_moves_to_front() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let a = f.notes.add_note(key, "a", "").await.unwrap();
    let _b = f.notes.add_note(key, "b", "").await.unwrap();
    let _c = f.notes.add_note(key, "c", "").await.unwrap();

    f.notes.update_note(key, &a.id, "a2", "").await.unwrap();

    let listing = f.notes.list_notes(key).await.unwrap();
    assert_eq!(listing.notes[0].id, a.id);
    assert_eq!(listing.notes[0].title, "a2");
    for pair in listing.notes.windows(2) {
        assert!(pair[0].updated_at >= pair[1].updated_at);
    }
}

#[tokio::test]
async fn listing_is_deterministic() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    for i in 0..10 {
        f.notes.add_note(key, &format!("n{i}"), "").await.unwrap();
    }

    let first = f.notes.list_notes(key).await.unwrap().notes;
    let second = f.notes.list_notes(key).await.unwrap().notes;
    assert_eq!(first, second);
}

#[tokio::test]
async fn unreadable_records_are_skipped_and_reported() {
    let f = unlocked().await;
    let key = f.session.master_key().unwrap();
    let good = f.notes.add_note(key, "good", "fine").await.unwrap();
    let damaged = f.notes.add_note(key, "damaged", "gone").await.unwrap();

    let mut record = raw_record(&f.store, &damaged.id).await;
    record.payload.ct = record.wrapped_note_key.ct.clone();
    f.store.put(Partition::Notes, &record).await.unwrap();

    f.store
        .operator()
        .write("notes/garbled.json", b"not json".to_vec())
        .await
        .unwrap();

    let listing = f.notes.list_notes(key).await.unwrap();
    assert_eq!(listing.notes, vec![good]);
    assert_eq!(listing.unreadable.len(), 2);

    let damaged_entry = listing
        .unreadable
        .iter()
        .find(|u| u.id == damaged.id)
        .unwrap();
    assert!(matches!(damaged_entry.error, NvError::Authentication));

    let garbled = listing.unreadable.iter().find(|u| u.id == "garbled").unwrap();
    assert!(matches!(garbled.error, NvError::Serialization(_)));
}

#[tokio::test]
async fn notes_from_another_vault_are_unreadable() {
    let f = unlocked().await;
    let other = unlocked().await;
    let note = f
        .notes
        .add_note(f.session.master_key().unwrap(), "mine", "")
        .await
        .unwrap();

    let record = raw_record(&f.store, &note.id).await;
    other.store.put(Partition::Notes, &record).await.unwrap();

    let result: NvResult<_> = other
        .notes
        .get_note(other.session.master_key().unwrap(), &note.id)
        .await;
    assert!(matches!(result, Err(NvError::Authentication)));
}

#[tokio::test]
async fn locked_session_cannot_reach_notes() {
    let mut f = unlocked().await;
    f.session.lock();
    assert!(matches!(f.session.master_key(), Err(NvError::Locked)));
}
