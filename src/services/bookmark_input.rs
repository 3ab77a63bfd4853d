//! Normalization of raw form input into a storable bookmark.
//!
//! URLs gain an `https://` prefix when they carry no explicit scheme and must
//! then parse as absolute URLs. Tags arrive as one comma-separated string.

use reqwest::Url;

use crate::types::bookmark::{BookmarkDraft, NewBookmark, UNTITLED};
use crate::types::errors::ErrorKind;

/// Scheme prepended to input that has none.
pub const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Returns true if `input` starts with `scheme://` where scheme follows
/// RFC 3986 (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`).
pub fn has_explicit_scheme(input: &str) -> bool {
    let Some(end) = input.find("://") else {
        return false;
    };
    let scheme = &input[..end];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Trims `raw`, prefixes `https://` if it lacks a scheme, and validates the
/// result as an absolute URL.
///
/// The returned string is the normalized input, not the parser's
/// re-serialization, so `github.com` becomes `https://github.com`.
pub fn normalize_url(raw: &str) -> Result<String, ErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ErrorKind::InvalidUrl);
    }

    let candidate = if has_explicit_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    match Url::parse(&candidate) {
        Ok(url) if !url.cannot_be_a_base() => Ok(candidate),
        _ => Err(ErrorKind::InvalidUrl),
    }
}

/// Splits on commas, trims each piece and drops empty ones. Order and
/// duplicates are kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed title, or `"Untitled"` when nothing is left.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Validates the URL of a draft. Kept separate from [`build_new_bookmark`]
/// because validation happens before the principal is resolved.
pub fn validate_draft(draft: &BookmarkDraft) -> Result<String, ErrorKind> {
    normalize_url(&draft.url)
}

/// Builds the insert payload from an already-validated URL.
pub fn build_new_bookmark(normalized_url: String, draft: &BookmarkDraft, owner: &str) -> NewBookmark {
    NewBookmark {
        url: normalized_url,
        title: normalize_title(&draft.title),
        tags: parse_tags(&draft.tags),
        owner: owner.to_string(),
    }
}
