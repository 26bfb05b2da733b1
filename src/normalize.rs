//! Turns raw user input into a scheme-qualified URL.

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Hosts that are served over plain HTTP when the user omits the scheme.
const PLAIN_HTTP_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Normalize raw user text into a canonical URL.
///
/// Whitespace is trimmed. An empty result means there is nothing to submit.
/// Input that already starts with `http://` or `https://` (any case) is
/// returned as-is; local hosts get `http://`, everything else `https://`.
/// No further validation happens here: a malformed URL fails later, when a
/// frame tries to load it.
///
/// ```
/// assert_eq!(layoutlab::normalize("chatgpt.com"), "https://chatgpt.com");
/// assert_eq!(layoutlab::normalize(" localhost:3000 "), "http://localhost:3000");
/// assert_eq!(layoutlab::normalize("   "), "");
/// ```
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if has_scheme(trimmed) {
        return trimmed.to_string();
    }

    let scheme = if PLAIN_HTTP_HOSTS.iter().any(|h| trimmed.starts_with(h)) {
        HTTP
    } else {
        HTTPS
    };
    format!("{}{}", scheme, trimmed)
}

fn has_scheme(s: &str) -> bool {
    [HTTP, HTTPS].iter().any(|scheme| {
        s.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}
