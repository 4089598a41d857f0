//! Composition field behaviour: sending, autosize, Enter handling and the
//! send button's connected/disconnected affordance.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde_json::Value;

use crate::binder::Binding;
use crate::connection::{ConnectionManager, SEND_EVENT};
use crate::dom::{Composer, KeyPress};

/// What a keydown in the composer should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Send and suppress the newline.
    Send,
    /// Let the browser handle the key.
    Default,
}

pub fn key_action(key: &KeyPress) -> KeyAction {
    if key.key == "Enter" && !key.shift { KeyAction::Send } else { KeyAction::Default }
}

/// Outbound `send_message` payload.
pub fn outbound_payload(receiver_id: u64, content: &str) -> Value {
    serde_json::json!({ "receiver_id": receiver_id, "content": content })
}

/// Emit the composed text if connected and non-blank.
///
/// Returns `true` when an event was emitted. On success the field is cleared,
/// resized and refocused; otherwise nothing changes.
pub fn send(binding: &Binding, connection: &ConnectionManager, max_px: u32) -> bool {
    let composer = binding.composer();
    let content = composer.value();
    if !connection.is_connected() || content.trim().is_empty() {
        return false;
    }

    connection.emit(SEND_EVENT, outbound_payload(binding.receiver_id(), &content));
    composer.set_value("");
    autosize(composer, max_px);
    composer.focus();
    true
}

/// Fit the field to its content, between its intrinsic height and `max_px`.
pub fn autosize(composer: &dyn Composer, max_px: u32) {
    composer.reset_height();
    let needed = composer.scroll_height();
    composer.set_height(needed.min(max_px));
    composer.set_scrollable(needed > max_px);
}

/// Reflect connection health on the send button. Composed text is kept.
pub fn apply_connection_state(binding: &Binding, connected: bool) {
    binding.send_control().set_disabled(!connected);
}
