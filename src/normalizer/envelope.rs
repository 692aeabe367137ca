use log::{debug, warn};
use serde_json::Value;

/// Turns a possibly-stringified payload into JSON.
///
/// Strings are parsed; anything that fails to parse (or is `null`) counts as
/// absent data. Every other value is passed through untouched.
pub fn parse_loose(data: &Value) -> Option<Value> {
    match data {
        Value::Null => None,
        Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("payload is not JSON, treating as absent: {}", e);
                None
            }
        },
        other => Some(other.clone()),
    }
}

/// Unwraps a gateway-style `{ "body": "<json>", "statusCode": ... }` envelope.
///
/// When `body` fails to parse the original value is kept, since its other
/// fields may still be usable.
pub fn unwrap_envelope(data: Value) -> Value {
    let parsed = match data.get("body").and_then(Value::as_str) {
        Some(body) => serde_json::from_str::<Value>(body),
        None => return data,
    };

    match parsed {
        Ok(inner) => inner,
        Err(e) => {
            warn!("failed to parse envelope body, keeping original payload: {}", e);
            data
        }
    }
}

/// Returns true when a payload carries an upstream application error.
pub fn has_error(data: &Value) -> bool {
    data.get("error").is_some_and(|error| !error.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwraps_stringified_body() {
        let wrapped = json!({ "statusCode": 200, "body": "{\"job_id\":\"j-1\"}" });
        assert_eq!(unwrap_envelope(wrapped), json!({ "job_id": "j-1" }));
    }

    #[test]
    fn keeps_original_when_body_is_garbage() {
        let wrapped = json!({ "statusCode": 200, "body": "{not json", "job_id": "j-2" });
        assert_eq!(unwrap_envelope(wrapped.clone()), wrapped);
    }

    #[test]
    fn leaves_plain_payloads_alone() {
        let plain = json!({ "results": [] });
        assert_eq!(unwrap_envelope(plain.clone()), plain);
    }

    #[test]
    fn unparseable_strings_are_absent() {
        assert_eq!(parse_loose(&json!("<html>oops</html>")), None);
        assert_eq!(parse_loose(&json!("[1,2]")), Some(json!([1, 2])));
        assert_eq!(parse_loose(&Value::Null), None);
    }
}
