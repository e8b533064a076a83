//! `Set-Cookie` collection and `Cookie` header assembly.
//!
//! Browser-oriented APIs hand out their session in `Set-Cookie` headers and
//! expect it back verbatim in `Cookie`. Only the leading `name=value` segment
//! of each `Set-Cookie` is kept; attributes (`Path`, `HttpOnly`, ...) are
//! dropped. Pairs are kept in arrival order and same-name cookies are
//! appended rather than replaced.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Returns every `Set-Cookie` header value, in the order received.
///
/// Values that are not valid UTF-8 are skipped.
pub fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Returns the `name=value` segment of a `Set-Cookie` value.
///
/// Returns `None` for blank values.
pub fn cookie_pair(set_cookie: &str) -> Option<&str> {
    let pair = set_cookie.split(';').next().unwrap_or_default().trim();
    (!pair.is_empty()).then_some(pair)
}

/// Finds the value of the first cookie called `name` in a list of
/// `Set-Cookie` values.
pub fn find_cookie_value(set_cookies: &[String], name: &str) -> Option<String> {
    set_cookies
        .iter()
        .filter_map(|c| cookie_pair(c))
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name && !value.is_empty()).then(|| value.to_string())
        })
}

// ============================================================================
// Cookie Header
// ============================================================================

/// An ordered `Cookie` header under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieHeader {
    pairs: Vec<String>,
}

impl CookieHeader {
    /// Creates an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header from `Set-Cookie` values.
    pub fn from_set_cookies<S: AsRef<str>>(set_cookies: &[S]) -> Self {
        let mut header = Self::new();
        header.append_set_cookies(set_cookies);
        header
    }

    /// Appends the `name=value` pairs of the given `Set-Cookie` values.
    ///
    /// Existing same-name pairs are kept.
    pub fn append_set_cookies<S: AsRef<str>>(&mut self, set_cookies: &[S]) {
        self.pairs.extend(
            set_cookies
                .iter()
                .filter_map(|c| cookie_pair(c.as_ref()))
                .map(str::to_string),
        );
    }

    /// Returns the value of the first pair called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then_some(value)
        })
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no cookies were collected.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the header value: pairs joined by `"; "`.
    pub fn as_header(&self) -> String {
        self.pairs.join("; ")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_cookie_pair() {
        assert_eq!(cookie_pair("csrftoken=ABC123; Path=/"), Some("csrftoken=ABC123"));
        assert_eq!(cookie_pair("sessionid=xyz"), Some("sessionid=xyz"));
        assert_eq!(cookie_pair("  "), None);
    }

    #[test]
    fn test_set_cookie_headers_keeps_order() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2; HttpOnly"));

        assert_eq!(
            set_cookie_headers(&headers),
            vec!["a=1; Path=/".to_string(), "b=2; HttpOnly".to_string()]
        );
    }

    #[test]
    fn test_find_cookie_value() {
        let cookies = vec![
            "__cf_bm=zzz; Path=/".to_string(),
            "csrftoken=ABC123; Path=/; SameSite=Lax".to_string(),
        ];
        assert_eq!(find_cookie_value(&cookies, "csrftoken"), Some("ABC123".to_string()));
        assert_eq!(find_cookie_value(&cookies, "sessionid"), None);
    }

    #[test]
    fn test_find_cookie_value_ignores_name_suffix() {
        let cookies = vec!["xcsrftoken=nope".to_string(), "csrftoken=yes".to_string()];
        assert_eq!(find_cookie_value(&cookies, "csrftoken"), Some("yes".to_string()));
    }

    #[test]
    fn test_header_appends_duplicates() {
        let mut header = CookieHeader::from_set_cookies(&["csrftoken=ABC123; Path=/", "a=1"]);
        header.append_set_cookies(&["sessionid=s1; HttpOnly", "csrftoken=DEF456; Path=/"]);

        assert_eq!(header.len(), 4);
        assert_eq!(
            header.as_header(),
            "csrftoken=ABC123; a=1; sessionid=s1; csrftoken=DEF456"
        );
        // Lookup returns the earliest pair.
        assert_eq!(header.get("csrftoken"), Some("ABC123"));
        assert_eq!(header.get("sessionid"), Some("s1"));
    }

    #[test]
    fn test_empty_header() {
        let header = CookieHeader::new();
        assert!(header.is_empty());
        assert_eq!(header.as_header(), "");
    }
}
