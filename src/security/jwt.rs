//! JWT token inspection for plan selection.
//!
//! Only the payload is decoded here; signature verification belongs to the
//! JWT policy that runs once a plan has been selected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Decode the payload segment of a compact JWT. No verification.
pub fn decode_payload(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Resolve the client identifier from JWT claims.
///
/// Priority: a configured custom claim, then `azp` when non-empty, then
/// `aud` (first element when it is a list), then `client_id`.
pub fn extract_client_id(claims: &Value, custom_claim: Option<&str>) -> Option<String> {
    if let Some(name) = custom_claim {
        if let Some(value) = non_empty_string(claims.get(name)) {
            return Some(value);
        }
    }

    if let Some(azp) = non_empty_string(claims.get("azp")) {
        return Some(azp);
    }

    match claims.get("aud") {
        Some(Value::String(aud)) if !aud.is_empty() => return Some(aud.clone()),
        Some(Value::Array(audiences)) => {
            if let Some(first) = audiences.iter().find_map(|value| value.as_str()).filter(|value| !value.is_empty()) {
                return Some(first.to_string());
            }
        }
        _ => {}
    }

    non_empty_string(claims.get("client_id"))
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Encode claims into an unsigned compact JWT. Test helper for the gateway's
/// own suites, but usable wherever an inspectable token is needed.
pub fn encode_unsigned(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.")
}
