//! CSRF token discovery.
//!
//! The storefront backend expects the token it issued in the `X-CSRFToken`
//! header of every mutating request. Pages expose it as the `csrftoken`
//! cookie.

pub const HEADER: &str = "X-CSRFToken";

const COOKIE_NAME: &str = "csrftoken";

/// Extracts the token from a `Cookie` header value.
pub fn from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| percent_decode(value))
        .filter(|token| !token.is_empty())
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
