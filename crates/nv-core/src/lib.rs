pub mod body;
pub mod config;
pub mod error;
pub mod types;

pub use body::{ChecklistItem, NoteBody};
pub use error::{NvError, NvResult};
pub use types::{Note, VaultStatus};
