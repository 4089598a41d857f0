//! One-shot rendering of the backlog serialized onto the message list.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use serde_json::Value;

use crate::binder::Binding;
use crate::dom::DATA_HISTORY;
use crate::message::Message;
use crate::render;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("backlog is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backlog is not a list")]
    NotAList,
}

/// Parse a serialized backlog into messages, preserving order.
///
/// # Errors
///
/// Fails when the text is not JSON or not a JSON array.
pub fn parse_backlog(raw: &str) -> Result<Vec<Message>, HistoryError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok(items.iter().map(Message::from_payload).collect()),
        _ => Err(HistoryError::NotAList),
    }
}

/// Render the list's backlog, then clear it so it is never read again.
///
/// Returns how many backlog entries were handed to the renderer.
pub fn preload(binding: &Binding) -> usize {
    let list = binding.list();
    let Some(raw) = list.data(DATA_HISTORY) else {
        return 0;
    };

    let handed = if raw.trim().is_empty() {
        0
    } else {
        match parse_backlog(&raw) {
            Ok(messages) => {
                for message in &messages {
                    render::render(binding, message);
                }
                messages.len()
            }
            Err(e) => {
                log::warn!("skipping chat backlog: {e}");
                0
            }
        }
    };

    list.remove_data(DATA_HISTORY);
    handed
}
