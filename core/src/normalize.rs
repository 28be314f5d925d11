//! Response Normalization
//!
//! Models are asked to reply with a bare JSON payload, but in practice
//! they wrap it in prose or markdown fencing more often than not.
//! [`massage`] extracts the payload without ever altering a reply that is
//! already well-formed, so running it twice is the same as running it
//! once.
//!
//! The core does not validate the payload beyond "is it JSON-shaped";
//! whatever comes out is handed downstream as an opaque string, and a
//! reply that defeats extraction is passed through for the downstream
//! parser to reject.

use serde_json::Value;

/// Extract a JSON payload from free-form model output
///
/// Three tiers, first match wins:
///
/// 1. the whole reply parses as a JSON object or array - returned
///    unchanged;
/// 2. the reply contains a fenced code block (triple backticks, optional
///    `json` tag) whose trimmed inner text parses as a JSON object or
///    array - the trimmed inner text is returned;
/// 3. best-effort passthrough - the reply is returned unchanged and the
///    downstream parse failure is the surfaced error.
#[must_use]
pub fn massage(raw: &str) -> &str {
    if is_json_payload(raw) {
        return raw;
    }

    if let Some(inner) = fenced_block(raw) {
        if is_json_payload(inner) {
            return inner;
        }
    }

    raw
}

/// Whether `text` parses as a JSON object or array
///
/// Arrays count: a model that replies with a bare step list is still
/// giving us a machine-parseable payload.
fn is_json_payload(text: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(text),
        Ok(Value::Object(_) | Value::Array(_))
    )
}

/// The trimmed contents of the first fenced code block, if any
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let body = &raw[open + 3..];
    let body = body.strip_prefix("json").unwrap_or(body);
    let close = body.find("```")?;
    Some(body[..close].trim())
}
