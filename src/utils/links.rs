use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static HTTP_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://")
        .unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
});

/// Whether the (trimmed) input should be fetched rather than summarized as-is.
///
/// Only the prefix is checked, case-insensitively, so `HTTPS://Example.com`
/// counts while `www.example.com` and `ftp://...` do not.
#[must_use]
pub fn is_http_url(input: &str) -> bool {
    HTTP_PREFIX_RE.is_match(input.trim())
}

/// Parse a user-supplied URL into the form we actually request.
///
/// Surrounding quotes and angle brackets (as left by chat clients and
/// copy/paste from markdown) are stripped, trailing sentence punctuation is
/// dropped and the fragment is removed. Returns `None` for anything that is
/// not an absolute `http(s)` URL.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<Url> {
    let raw = raw
        .trim()
        .trim_start_matches(|c: char| matches!(c, '<' | '"' | '\''));
    let raw = trim_trailing_punctuation(raw);
    if !is_http_url(raw) {
        return None;
    }

    let mut url = Url::parse(raw).ok()?;
    if url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[must_use]
fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(&['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''][..])
}
