//! A vault created on the fs backend opens again from a fresh operator.

use nv_core::config::NvConfig;
use nv_core::{NvError, VaultStatus};
use secrecy::SecretString;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> NvConfig {
    let mut config = NvConfig::default();
    config.storage.backend = "fs".into();
    config.storage.root = dir.path().join("store");
    config.vault.pass_iterations = 1_000;
    config.vault.recovery_iterations = 1_000;
    config.vault.marker_file = Some(dir.path().join("has-vault"));
    config
}

#[tokio::test]
async fn vault_and_notes_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let passphrase = SecretString::from("correct-password".to_string());

    let note = {
        let (mut session, notes) = nv_vault::open(&config).unwrap();
        assert_eq!(session.refresh().await.unwrap(), VaultStatus::NeedsSetup);
        session.setup_vault(&passphrase).await.unwrap();
        notes
            .add_note(session.master_key().unwrap(), "Groceries", "milk, eggs")
            .await
            .unwrap()
    };

    assert!(tmp.path().join("store/vault/default.json").exists());
    assert!(tmp
        .path()
        .join(format!("store/notes/{}.json", note.id))
        .exists());

    let (mut session, notes) = nv_vault::open(&config).unwrap();
    assert_eq!(session.initial_guess().await, VaultStatus::Locked);
    assert_eq!(session.refresh().await.unwrap(), VaultStatus::Locked);
    session.unlock_with_passphrase(&passphrase).await.unwrap();

    let listing = notes.list_notes(session.master_key().unwrap()).await.unwrap();
    assert_eq!(listing.notes, vec![note]);
}

#[tokio::test]
async fn refresh_store_error_keeps_status() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let (mut session, _notes) = nv_vault::open(&config).unwrap();
    session.refresh().await.unwrap();
    session
        .setup_vault(&SecretString::from("pw".to_string()))
        .await
        .unwrap();
    assert_eq!(session.status(), VaultStatus::Unlocked);

    // Vault partition replaced by a regular file: the record path is unreadable
    let partition = tmp.path().join("store/vault");
    std::fs::remove_dir_all(&partition).unwrap();
    std::fs::write(&partition, b"blocked").unwrap();

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, NvError::Storage(_)), "got {err:?}");
    assert!(err.is_retryable());
    assert_eq!(session.status(), VaultStatus::Unlocked);
    assert!(session.master_key().is_ok());
}
