// src/ai/extract.rs
//! Best-effort recovery of a JSON object embedded in model chatter.
//!
//! Only for untrusted generator output. Trusted input goes straight to `serde_json`.

/// Slice from the first `{` to the last `}` inclusive.
///
/// Returns `None` when either brace is missing or the last `}` precedes the first `{`.
/// Nested or multiple objects are not balanced; whatever lies between the outermost
/// braces is returned for the caller to parse.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
