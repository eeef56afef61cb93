use serde::{Deserialize, Serialize};
use std::fmt;

use crate::body::NoteBody;

/// A decrypted note. Only ever exists in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Opaque to the storage core; see [`Note::body`] for the structured view.
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    /// Milliseconds since the Unix epoch, bumped on every content change
    pub updated_at: i64,
}

impl Note {
    pub fn body(&self) -> NoteBody {
        NoteBody::decode(&self.text)
    }
}

/// Lifecycle state of the vault within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaultStatus {
    /// Initial state, before the vault record has been looked up
    Checking,
    /// No vault record is persisted
    NeedsSetup,
    /// A vault record exists but no master key is held
    Locked,
    /// The master key is held in memory
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Checking => "checking",
            VaultStatus::NeedsSetup => "needs-setup",
            VaultStatus::Locked => "locked",
            VaultStatus::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
