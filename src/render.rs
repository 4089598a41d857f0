//! Message bubble construction and rendering.
//!
//! [`Bubble::from_message`] is a pure transformation; [`render`] appends the
//! result to a binding's list and scrolls it into view. Neither ever fails:
//! unrenderable input is dropped silently.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::binder::Binding;
use crate::message::{Message, escape_html, time_label};

pub const UNKNOWN_SENDER: &str = "Unknown";
pub const SELF_LABEL: &str = "You";

/// Who wrote a message, relative to the bound user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Own,
    Other,
}

/// A fully prepared chat bubble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bubble {
    pub side: Side,
    /// Header name: `"You"` for own messages, else the sender.
    pub display_name: String,
    /// Short local time; empty when the message has no usable timestamp.
    pub time_label: String,
    /// Escaped content with newlines turned into `<br>`.
    pub body_html: String,
}

impl Bubble {
    /// Element tags of a bubble row and its body; the list container is a `<ul>`.
    pub const ROW_TAG: &'static str = "li";
    pub const BODY_TAG: &'static str = "p";

    /// Build a bubble for `message` as seen by `current_user` (lowercased).
    ///
    /// Returns `None` when the escaped content is empty.
    pub fn from_message(message: &Message, current_user: &str) -> Option<Self> {
        let escaped = escape_html(message.content.as_deref().unwrap_or_default());
        if escaped.is_empty() {
            return None;
        }

        let sender = message.sender.as_deref().filter(|s| !s.is_empty());
        let side = match sender {
            Some(name) if !current_user.is_empty() && name.to_lowercase() == current_user => Side::Own,
            _ => Side::Other,
        };
        let display_name = match side {
            Side::Own => SELF_LABEL.to_owned(),
            Side::Other => sender.unwrap_or(UNKNOWN_SENDER).to_owned(),
        };

        Some(Self {
            side,
            display_name,
            time_label: time_label(message.timestamp.as_deref()),
            body_html: escaped.replace('\n', "<br>"),
        })
    }

    pub fn is_own(&self) -> bool {
        self.side == Side::Own
    }

    /// Whether the header carries a time element at all.
    pub fn has_time_label(&self) -> bool {
        !self.time_label.is_empty()
    }

    pub fn row_class(&self) -> &'static str {
        match self.side {
            Side::Own => "flex w-full justify-end",
            Side::Other => "flex w-full justify-start",
        }
    }

    pub fn bubble_class(&self) -> &'static str {
        match self.side {
            Side::Own => "max-w-[70%] px-4 py-3 rounded-2xl shadow-sm bg-emerald-500 text-white rounded-br-md",
            Side::Other => {
                "max-w-[70%] px-4 py-3 rounded-2xl shadow-sm bg-white text-slate-800 border border-slate-200 rounded-bl-md"
            }
        }
    }

    pub fn header_class(&self) -> &'static str {
        match self.side {
            Side::Own => "flex items-center justify-end gap-2 mb-1",
            Side::Other => "flex items-center justify-start gap-2 mb-1",
        }
    }

    pub fn name_class(&self) -> &'static str {
        match self.side {
            Side::Own => "text-xs font-semibold text-white/80",
            Side::Other => "text-xs font-semibold text-emerald-600",
        }
    }

    pub fn time_class(&self) -> &'static str {
        match self.side {
            Side::Own => "text-[10px] uppercase tracking-wide text-white/60",
            Side::Other => "text-[10px] uppercase tracking-wide text-slate-400",
        }
    }

    pub fn body_class(&self) -> &'static str {
        "leading-relaxed"
    }
}

/// Append `message` to the binding's list and scroll to it.
pub fn render(binding: &Binding, message: &Message) {
    let Some(bubble) = Bubble::from_message(message, binding.current_user()) else {
        log::debug!("dropping chat message with empty content");
        return;
    };
    let list = binding.list();
    list.append_bubble(&bubble);
    list.scroll_to_latest();
}
