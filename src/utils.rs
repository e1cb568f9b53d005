//! String helpers for operator-facing output
//!
//! Tokens and vendor responses end up in terminal output and logs. These helpers
//! shorten them without panicking on multi-byte characters and hide the secret
//! middle part of credentials.

/// Characters kept at the start of a masked secret
const MASK_HEAD: usize = 6;
/// Characters kept at the end of a masked secret
const MASK_TAIL: usize = 4;
/// Secrets this short are hidden entirely
const MASK_MIN_CHARS: usize = 16;

/// Longest prefix of `s` that fits in `max_bytes` and ends on a char boundary
///
/// ```
/// use sp_api_auth::utils::safe_truncate;
///
/// assert_eq!(safe_truncate("Atza|IwEB", 4), "Atza");
/// assert_eq!(safe_truncate("caf\u{e9}", 4), "caf");
/// ```
#[must_use]
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    let end = s
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Vendor response excerpt for logs, with "..." marking a cut
///
/// ```
/// use sp_api_auth::utils::truncate_for_display;
///
/// let body = r#"{"error":"invalid_grant"}"#;
/// assert_eq!(truncate_for_display(body, 10), r#"{"error":"..."#);
/// assert_eq!(truncate_for_display(body, 100), body);
/// ```
#[must_use]
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    match safe_truncate(s, max_bytes) {
        whole if whole.len() == s.len() => whole.to_string(),
        head => format!("{head}..."),
    }
}

/// Mask a secret for display, keeping only a few leading and trailing characters.
///
/// Short secrets are fully hidden so that the visible parts never make up most of
/// the value.
///
/// # Example
/// ```
/// use sp_api_auth::utils::mask_secret;
///
/// assert_eq!(mask_secret("Atza|IwEBIExampleAccessToken"), "Atza|I...oken");
/// assert_eq!(mask_secret("short"), "***");
/// ```
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= MASK_MIN_CHARS {
        return "***".to_string();
    }

    let head: String = secret.chars().take(MASK_HEAD).collect();
    let tail: String = secret.chars().skip(count - MASK_TAIL).collect();
    format!("{head}...{tail}")
}
