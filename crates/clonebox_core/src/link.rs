//! Link normalization.

use clonebox_error::{CloneboxResult, ContentError, ContentErrorKind};
use url::Url;

/// Normalize a submitted link into the string the registry keys on.
///
/// Surrounding whitespace is trimmed and links without an `http://` or
/// `https://` prefix get `https://` prepended. The result must parse as an
/// absolute URL with a host. The returned string is the trimmed input plus the
/// optional prefix and nothing else: `https://example.com` and
/// `https://example.com/` stay distinct.
///
/// # Errors
///
/// Returns `InvalidContent` for empty input or anything that does not parse as
/// an absolute URL with a host.
///
/// # Examples
///
/// ```
/// use clonebox_core::normalize_link;
///
/// assert_eq!(normalize_link(" example.com/a ").unwrap(), "https://example.com/a");
/// assert_eq!(normalize_link("http://example.com").unwrap(), "http://example.com");
/// assert!(normalize_link("https://").is_err());
/// ```
pub fn normalize_link(raw: &str) -> CloneboxResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ContentError::new(ContentErrorKind::InvalidContent(
            "link is empty".to_string(),
        )))?
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| {
        ContentError::new(ContentErrorKind::InvalidContent(format!(
            "{}: {}",
            candidate, e
        )))
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(candidate),
        _ => Err(ContentError::new(ContentErrorKind::InvalidContent(format!(
            "{}: missing host",
            candidate
        )))
        .into()),
    }
}

fn has_http_scheme(link: &str) -> bool {
    let lower = link.get(..8).unwrap_or(link).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
