//! Chat message record plus the text helpers the renderer relies on.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use serde_json::Value;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A single chat message as delivered by the server or the page backlog.
///
/// Every field may be absent on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub sender: Option<String>,
    pub content: Option<String>,
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(sender: &str, content: &str, timestamp: Option<&str>) -> Self {
        Self {
            sender: Some(sender.to_owned()),
            content: Some(content.to_owned()),
            timestamp: timestamp.map(ToOwned::to_owned),
        }
    }

    /// Extract a message from an arbitrary JSON payload.
    ///
    /// Fields holding anything other than a string are treated as absent,
    /// and a non-object payload yields an empty message.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |name: &str| payload.get(name).and_then(Value::as_str).map(ToOwned::to_owned);
        Self { sender: field("sender"), content: field("content"), timestamp: field("timestamp") }
    }
}

/// Escape text so it can be placed into markup as literal characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// A parsed message timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timestamp {
    /// An instant with a known offset; shown in the viewer's local offset.
    Zoned(OffsetDateTime),
    /// A wall-clock date-time without offset; shown as written.
    Local(PrimitiveDateTime),
}

impl Timestamp {
    /// Parse RFC 3339, ISO 8601 date-times (with or without offset), or a bare
    /// ISO date (taken as midnight UTC).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(Self::Zoned(at));
        }
        if let Ok(at) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
            return Some(Self::Zoned(at));
        }
        if let Ok(at) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
            return Some(Self::Local(at));
        }
        Date::parse(raw, &Iso8601::DEFAULT)
            .ok()
            .map(|date| Self::Zoned(date.midnight().assume_utc()))
    }

    /// Two-digit `HH:MM`, converting zoned instants into `offset`.
    ///
    /// Empty when the converted instant falls outside the supported years.
    pub fn short_time(self, offset: UtcOffset) -> String {
        let clock = format_description!("[hour]:[minute]");
        let formatted = match self {
            Self::Zoned(at) => match at.checked_to_offset(offset) {
                Some(local) => local.format(&clock),
                None => return String::new(),
            },
            Self::Local(at) => at.format(&clock),
        };
        formatted.unwrap_or_default()
    }
}

/// Short local time label for a raw timestamp; empty when absent or invalid.
pub fn time_label(raw: Option<&str>) -> String {
    raw.and_then(Timestamp::parse)
        .map(|ts| ts.short_time(local_offset()))
        .unwrap_or_default()
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
