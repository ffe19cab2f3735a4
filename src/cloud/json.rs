//! Minimal JSON access: a key-lookup scanner, not a general parser.
//!
//! Recognizes `"key":` followed by optional whitespace, then either a
//! quoted string or a decimal number. Unknown keys are ignored. This is
//! intentionally not a full JSON implementation — the wire contract with
//! the backend only ever needs flat key/value lookups.

/// Find `"key":` in `body` and return the raw string value, or `None` if
/// the key is absent or its value is not a quoted string.
pub fn get_string<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let value_start = find_value_start(body, key)?;
    let rest = &body[value_start..];
    let rest = rest.trim_start();
    let quoted = rest.strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some(&quoted[..end])
}

/// Find `"key":` in `body` and return the value parsed as an unsigned
/// integer, or `None` if the key is absent or its value is not numeric.
pub fn get_uint(body: &str, key: &str) -> Option<u64> {
    let value_start = find_value_start(body, key)?;
    let rest = body[value_start..].trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}

fn find_value_start(body: &str, key: &str) -> Option<usize> {
    let needle = format!("\"{key}\"");
    let key_pos = body.find(&needle)?;
    let after_key = key_pos + needle.len();
    let colon_rel = body[after_key..].find(':')?;
    Some(after_key + colon_rel + 1)
}

/// Build `{"hardware_id":"...","timestamp":"...","signature":"..."}` (or
/// the `device_id` variant). Identities are ASCII by contract, so no
/// escaping is performed.
pub fn build_auth_payload(id_key: &str, id_value: &str, timestamp: &str, signature: &str) -> String {
    format!(
        "{{\"{id_key}\":\"{id_value}\",\"timestamp\":\"{timestamp}\",\"signature\":\"{signature}\"}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_string_finds_value() {
        let body = r#"{"status":"active","device_id":"dev-42"}"#;
        assert_eq!(get_string(body, "status"), Some("active"));
        assert_eq!(get_string(body, "device_id"), Some("dev-42"));
    }

    #[test]
    fn get_string_missing_key_is_none() {
        let body = r#"{"status":"active"}"#;
        assert_eq!(get_string(body, "missing"), None);
    }

    #[test]
    fn get_uint_finds_value() {
        let body = r#"{"poll_interval": 30, "status":"unclaimed"}"#;
        assert_eq!(get_uint(body, "poll_interval"), Some(30));
    }

    #[test]
    fn get_uint_rejects_non_numeric() {
        let body = r#"{"poll_interval":"soon"}"#;
        assert_eq!(get_uint(body, "poll_interval"), None);
    }

    #[test]
    fn whitespace_after_colon_is_tolerated() {
        let body = r#"{"status"   :    "active"}"#;
        assert_eq!(get_string(body, "status"), Some("active"));
    }

    #[test]
    fn build_auth_payload_matches_contract_shape() {
        let payload = build_auth_payload("hardware_id", "hw-1", "2026-07-30T00:00:00Z", "deadbeef");
        assert_eq!(
            payload,
            r#"{"hardware_id":"hw-1","timestamp":"2026-07-30T00:00:00Z","signature":"deadbeef"}"#
        );
    }
}
