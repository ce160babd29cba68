/// Key layout of the `drafts` partition: form-{form_id} -> Draft (JSON)

/// Storage key used for forms without a name
pub const ANONYMOUS_FORM_KEY: &str = "anonymous-form";

/// Encode a draft key; a blank form id maps to [`ANONYMOUS_FORM_KEY`]
pub fn encode_draft_key(form_id: Option<&str>) -> Vec<u8> {
    match form_id.map(str::trim) {
        Some(id) if !id.is_empty() => format!("form-{}", id).into_bytes(),
        _ => ANONYMOUS_FORM_KEY.as_bytes().to_vec(),
    }
}

/// Decode a draft key back to its form id (`None` for the anonymous form)
pub fn decode_draft_key(key: &[u8]) -> Option<Option<String>> {
    let key_str = std::str::from_utf8(key).ok()?;
    if key_str == ANONYMOUS_FORM_KEY {
        return Some(None);
    }
    key_str
        .strip_prefix("form-")
        .map(|id| Some(id.to_string()))
}

/// Fields whose name mentions a password are never persisted
pub fn is_sensitive_field(name: &str) -> bool {
    name.to_ascii_lowercase().contains("password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_key_encoding() {
        assert_eq!(encode_draft_key(Some("jobForm")), b"form-jobForm");
        assert_eq!(decode_draft_key(b"form-jobForm"), Some(Some("jobForm".to_string())));
    }

    #[test]
    fn test_anonymous_form_key() {
        assert_eq!(encode_draft_key(None), b"anonymous-form");
        assert_eq!(encode_draft_key(Some("  ")), b"anonymous-form");
        assert_eq!(decode_draft_key(b"anonymous-form"), Some(None));
        assert_eq!(decode_draft_key(b"meta:x"), None);
    }

    #[test]
    fn test_sensitive_fields() {
        assert!(is_sensitive_field("password"));
        assert!(is_sensitive_field("proxy_Password_confirm"));
        assert!(!is_sensitive_field("query"));
    }
}
