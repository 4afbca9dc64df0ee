//! Inbound message channel from the overlay script.
//!
//! The surface transport delivers raw strings; each is a JSON envelope
//! `{"channel": ..., "body": ...}`. Exactly one channel is recognized.
//! Bodies use a colon-delimited prefix and a pipe-delimited payload:
//!
//! - `ready:` — the overlay in this surface finished loading
//! - `token:<cb>|<token>|<err>` — session token issued
//! - `callback:<cb>|<result>|<err>` — reply to a correlated command
//!
//! Anything else (unknown channel, non-string body, unknown prefix,
//! malformed payload) parses to `None` and is dropped by the caller.

use serde::Deserialize;

/// The only channel the bridge listens on.
pub const MESSAGE_CHANNEL: &str = "lingVisSDK";

#[derive(Debug, Deserialize)]
struct Envelope {
    channel: String,
    body: serde_json::Value,
}

/// A recognized message from the overlay script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptMessage {
    /// The surface's overlay is loaded and expects session start.
    Ready,
    /// A session token was issued. `callback_id` is empty for tokens
    /// acquired by session start rather than an explicit sign-in.
    Token {
        callback_id: String,
        token: String,
        error: String,
    },
    /// Reply to a pending command.
    Callback {
        callback_id: String,
        result: String,
        error: String,
    },
}

impl ScriptMessage {
    /// Parse a raw transport string. Returns `None` for anything that is
    /// not a well-formed message on the recognized channel.
    pub fn parse(raw: &str) -> Option<Self> {
        let envelope: Envelope = serde_json::from_str(raw).ok()?;
        if envelope.channel != MESSAGE_CHANNEL {
            return None;
        }
        let body = envelope.body.as_str()?;
        Self::parse_body(body)
    }

    fn parse_body(body: &str) -> Option<Self> {
        if body == "ready:" {
            return Some(ScriptMessage::Ready);
        }
        if let Some(rest) = body.strip_prefix("token:") {
            let (callback_id, token, error) = split_payload(rest)?;
            return Some(ScriptMessage::Token {
                callback_id,
                token,
                error,
            });
        }
        if let Some(rest) = body.strip_prefix("callback:") {
            let (callback_id, result, error) = split_payload(rest)?;
            return Some(ScriptMessage::Callback {
                callback_id,
                result,
                error,
            });
        }
        None
    }
}

/// Split a `a|b|c` payload into exactly three fields. The last field keeps
/// any further pipes, since result blobs may contain them.
fn split_payload(rest: &str) -> Option<(String, String, String)> {
    let mut parts = rest.splitn(3, '|');
    let first = parts.next()?.to_string();
    let second = parts.next()?.to_string();
    let third = parts.next()?.to_string();
    Some((first, second, third))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(channel: &str, body: serde_json::Value) -> String {
        serde_json::json!({ "channel": channel, "body": body }).to_string()
    }

    #[test]
    fn parses_ready() {
        let raw = envelope(MESSAGE_CHANNEL, "ready:".into());
        assert_eq!(ScriptMessage::parse(&raw), Some(ScriptMessage::Ready));
    }

    #[test]
    fn parses_token_without_callback() {
        let raw = envelope(MESSAGE_CHANNEL, "token:|tok-123|".into());
        assert_eq!(
            ScriptMessage::parse(&raw),
            Some(ScriptMessage::Token {
                callback_id: String::new(),
                token: "tok-123".into(),
                error: String::new(),
            })
        );
    }

    #[test]
    fn parses_token_with_callback_and_error() {
        let raw = envelope(MESSAGE_CHANNEL, "token:cb-1||bad credentials".into());
        assert_eq!(
            ScriptMessage::parse(&raw),
            Some(ScriptMessage::Token {
                callback_id: "cb-1".into(),
                token: String::new(),
                error: "bad credentials".into(),
            })
        );
    }

    #[test]
    fn parses_callback_reply() {
        let raw = envelope(MESSAGE_CHANNEL, "callback:cb-2|{\"l2\":\"fr\"}|".into());
        assert_eq!(
            ScriptMessage::parse(&raw),
            Some(ScriptMessage::Callback {
                callback_id: "cb-2".into(),
                result: "{\"l2\":\"fr\"}".into(),
                error: String::new(),
            })
        );
    }

    #[test]
    fn callback_result_keeps_extra_pipes() {
        let raw = envelope(MESSAGE_CHANNEL, "callback:cb-3|a|b|c".into());
        assert_eq!(
            ScriptMessage::parse(&raw),
            Some(ScriptMessage::Callback {
                callback_id: "cb-3".into(),
                result: "a".into(),
                error: "b|c".into(),
            })
        );
    }

    #[test]
    fn ignores_unknown_channel() {
        let raw = envelope("otherChannel", "ready:".into());
        assert_eq!(ScriptMessage::parse(&raw), None);
    }

    #[test]
    fn ignores_non_string_body() {
        let raw = envelope(MESSAGE_CHANNEL, serde_json::json!({ "kind": "ready" }));
        assert_eq!(ScriptMessage::parse(&raw), None);
        let raw = envelope(MESSAGE_CHANNEL, serde_json::json!(42));
        assert_eq!(ScriptMessage::parse(&raw), None);
    }

    #[test]
    fn ignores_unknown_prefix() {
        let raw = envelope(MESSAGE_CHANNEL, "telemetry:1|2|3".into());
        assert_eq!(ScriptMessage::parse(&raw), None);
    }

    #[test]
    fn ignores_truncated_payload() {
        let raw = envelope(MESSAGE_CHANNEL, "token:cb-only".into());
        assert_eq!(ScriptMessage::parse(&raw), None);
        let raw = envelope(MESSAGE_CHANNEL, "callback:cb|result".into());
        assert_eq!(ScriptMessage::parse(&raw), None);
    }

    #[test]
    fn ignores_ready_with_trailing_payload() {
        let raw = envelope(MESSAGE_CHANNEL, "ready:now".into());
        assert_eq!(ScriptMessage::parse(&raw), None);
    }

    #[test]
    fn ignores_non_json_transport() {
        assert_eq!(ScriptMessage::parse("ready:"), None);
        assert_eq!(ScriptMessage::parse(""), None);
    }
}
