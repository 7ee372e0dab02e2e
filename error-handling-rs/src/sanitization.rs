//! # Secret Redaction
//!
//! Strips credential-shaped substrings from text before it is written to a log
//! line or included in a response body.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Replacement marker for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Shortest configured secret that is stripped verbatim. Anything shorter would
/// mangle ordinary words.
const MIN_KNOWN_SECRET_LEN: usize = 8;

// Static regex patterns for sensitive information detection, applied in order
static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // OAuth 2.0 bearer tokens
        (
            Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=\-]+").unwrap(),
            "Bearer [REDACTED]",
        ),
        // Provider API keys (sk-..., sk-proj-..., sk-or-v1-...)
        (Regex::new(r"\bsk-[A-Za-z0-9_\-]{8,}").unwrap(), REDACTED),
        // JWTs
        (
            Regex::new(r"eyJ[a-zA-Z0-9\-_]+\.eyJ[a-zA-Z0-9\-_]+\.[a-zA-Z0-9\-_]+").unwrap(),
            REDACTED,
        ),
        // key=value and "key": "value" pairs; keep the key, drop the value
        (
            Regex::new(
                r#"(?i)\b(api[_\- ]?key|access[_\-]?token|secret|password|authorization)(["']?\s*[=:]\s*["']?)[^"'\s,;&}]+"#,
            )
            .unwrap(),
            "${1}${2}[REDACTED]",
        ),
    ]
});

// List of field names whose values are never logged
static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let keys = [
        "password", "secret", "token", "key", "credential", "auth",
        "authorization", "api_key", "access_token", "refresh_token", "cookie",
    ];
    HashSet::from_iter(keys.iter().copied())
});

/// Determines if a field name is sensitive
pub fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();

    if SENSITIVE_KEYS.contains(key_lower.as_str()) {
        return true;
    }

    SENSITIVE_KEYS
        .iter()
        .any(|sensitive_key| key_lower.contains(*sensitive_key))
}

/// Replaces every credential-shaped substring of `message` with `[REDACTED]`
pub fn redact_secrets(message: &str) -> String {
    SENSITIVE_PATTERNS
        .iter()
        .fold(message.to_string(), |text, (pattern, replacement)| {
            pattern
                .replace_all(&text, |caps: &Captures| {
                    let mut out = String::new();
                    caps.expand(replacement, &mut out);
                    out
                })
                .into_owned()
        })
}

/// Like [`redact_secrets`], and also strips each of `known` verbatim.
///
/// Used with the configured provider credential so that a key which does not
/// look like a key is still never echoed back.
pub fn redact_with_known(message: &str, known: &[&str]) -> String {
    let mut text = message.to_string();
    for secret in known {
        let secret = secret.trim();
        if secret.len() >= MIN_KNOWN_SECRET_LEN {
            text = text.replace(secret, REDACTED);
        }
    }
    redact_secrets(&text)
}
