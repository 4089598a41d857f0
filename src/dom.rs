//! DOM seam consumed by the chat core.
//!
//! DESIGN
//! ======
//! The binder, renderer and input controller only talk to the page through
//! these traits. The `browser` module implements them over `web-sys`; tests
//! use in-memory fakes. Data keys are `dataset` names (camelCase), so
//! `"currentUser"` reads the `data-current-user` attribute.

use std::rc::Rc;

use crate::render::Bubble;

pub const DATA_CURRENT_USER: &str = "currentUser";
pub const DATA_RECEIVER_ID: &str = "receiverId";
pub const DATA_HISTORY: &str = "history";
pub const DATA_BINDING: &str = "chatBinding";

/// Event handler without payload (click, input).
pub type Handler = Box<dyn Fn()>;

/// Keydown handler; returns `true` when the key's default action must be
/// suppressed.
pub type KeyHandler = Box<dyn Fn(&KeyPress) -> bool>;

/// The parts of a keyboard event the composer cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: &str, shift: bool) -> Self {
        Self { key: key.to_owned(), shift }
    }
}

/// The message list container.
pub trait MessageList {
    fn data(&self, key: &str) -> Option<String>;
    fn set_data(&self, key: &str, value: &str);
    fn remove_data(&self, key: &str);
    fn append_bubble(&self, bubble: &Bubble);
    /// Smooth-scroll so the newest bubble is visible.
    fn scroll_to_latest(&self);
    /// Whether the node is still part of the page.
    fn is_attached(&self) -> bool;
}

/// The text composition field.
pub trait Composer {
    fn data(&self, key: &str) -> Option<String>;
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
    /// Drop any explicit height so the field falls back to its intrinsic size.
    fn reset_height(&self);
    /// Height needed to show the whole content, in pixels.
    fn scroll_height(&self) -> u32;
    fn set_height(&self, px: u32);
    fn set_scrollable(&self, scrollable: bool);
    fn focus(&self);
    fn on_keydown(&self, handler: KeyHandler);
    fn on_input(&self, handler: Handler);
}

/// The send button.
pub trait SendControl {
    fn data(&self, key: &str) -> Option<String>;
    fn set_disabled(&self, disabled: bool);
    fn on_click(&self, handler: Handler);
}

/// A DOM region the binder searches for a chat widget.
pub trait Scope {
    fn message_list(&self, id: &str) -> Option<Rc<dyn MessageList>>;
    fn composer(&self, id: &str) -> Option<Rc<dyn Composer>>;
    fn send_control(&self, id: &str) -> Option<Rc<dyn SendControl>>;
}
