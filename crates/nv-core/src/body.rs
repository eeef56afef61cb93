//! Structured view of a note's text.
//!
//! Stored note text is a plain string. Checklists are carried inside that
//! string as a marker line followed by a JSON document:
//!
//! ```text
//! __CHECKLIST_V1__
//! {"items":[{"id":"…","text":"milk","checked":false}]}
//! ```
//!
//! Decoding happens once, here, so callers match on [`NoteBody`] instead of
//! sniffing the marker themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CHECKLIST_MARKER: &str = "__CHECKLIST_V1__\n";

/// A single checklist row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub checked: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            text: text.into(),
            checked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteBody {
    Text(String),
    Checklist(Vec<ChecklistItem>),
}

impl NoteBody {
    /// Decode stored note text. Anything that is not a well-formed checklist
    /// is plain text.
    pub fn decode(text: &str) -> Self {
        match text.strip_prefix(CHECKLIST_MARKER) {
            Some(raw) => match decode_items(raw) {
                Some(items) => NoteBody::Checklist(ensure_at_least_one(items)),
                None => NoteBody::Text(text.to_string()),
            },
            None => NoteBody::Text(text.to_string()),
        }
    }

    /// Encode back into the stored string form.
    pub fn encode(&self) -> String {
        match self {
            NoteBody::Text(text) => text.clone(),
            NoteBody::Checklist(items) => {
                let doc = serde_json::json!({ "items": items });
                format!("{CHECKLIST_MARKER}{doc}")
            }
        }
    }

    /// True when there is nothing worth saving.
    pub fn is_blank(&self) -> bool {
        match self {
            NoteBody::Text(text) => text.trim().is_empty(),
            NoteBody::Checklist(items) => items.iter().all(|it| it.text.trim().is_empty()),
        }
    }

    /// Checklist rows in display order: unchecked first, then checked,
    /// each group keeping its stored order. Empty for text bodies.
    pub fn display_order(&self) -> Vec<&ChecklistItem> {
        match self {
            NoteBody::Text(_) => Vec::new(),
            NoteBody::Checklist(items) => {
                let (checked, unchecked): (Vec<_>, Vec<_>) =
                    items.iter().partition(|it| it.checked);
                unchecked.into_iter().chain(checked).collect()
            }
        }
    }
}

fn decode_items(raw: &str) -> Option<Vec<ChecklistItem>> {
    let doc: Value = serde_json::from_str(raw).ok()?;
    let items = match doc.get("items").and_then(Value::as_array) {
        Some(items) => items.iter().map(decode_item).collect(),
        None => Vec::new(),
    };
    Some(items)
}

fn decode_item(raw: &Value) -> ChecklistItem {
    let id = match raw.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => new_item_id(),
    };
    let text = match raw.get("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let checked = raw.get("checked").map(truthy).unwrap_or(false);
    ChecklistItem { id, text, checked }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn ensure_at_least_one(items: Vec<ChecklistItem>) -> Vec<ChecklistItem> {
    if items.is_empty() {
        vec![ChecklistItem::new("")]
    } else {
        items
    }
}

fn new_item_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
