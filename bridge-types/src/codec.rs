//! Script-literal-safe wire codec.
//!
//! Outbound messages are serialized to JSON and then escaped so the result
//! can be embedded inside a single-quoted script string literal and handed
//! to the peer's entry point. The peer unescapes and JSON-parses on its
//! side; [`unescape`] is the reference inverse, used by test harnesses to
//! decode captured scripts.

use crate::BridgeMessage;

/// Serialize a message and escape it for embedding in a single-quoted
/// script literal.
///
/// Escaped characters: backslash, single quote, double quote, newline,
/// carriage return, form feed, U+2028 and U+2029. The last two are legal
/// inside JSON strings but are line terminators to older script parsers.
/// Escaping is a single pass over the serialized text, so each source
/// character is rewritten exactly once and backslashes introduced by the
/// escapes themselves are never re-escaped.
///
/// Returns `None` if serialization fails; the caller must skip the send
/// rather than transmit a corrupt payload.
pub fn encode(message: &BridgeMessage) -> Option<String> {
    let json = serde_json::to_string(message).ok()?;
    Some(escape(&json))
}

/// Escape a raw string for embedding in a single-quoted script literal.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{000C}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse [`escape`].
///
/// This mirrors what the peer's entry point does to an injected payload
/// before JSON-parsing it. Unrecognized escape sequences are passed
/// through verbatim rather than rejected.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                // U+2028 and U+2029 are the only \uXXXX escapes we emit.
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse an inbound raw JSON string into a message.
///
/// Malformed input yields `None`, never a panic or an error: garbled
/// transport delivery must not crash the bridge, only drop the message.
pub fn decode(raw: &str) -> Option<BridgeMessage> {
    serde_json::from_str(raw).ok()
}
