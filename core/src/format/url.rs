//! URL grammar and structural validation.
//!
//! `scheme://[userinfo@]host[:port][/path][?query][#fragment]` with `http`/`https`
//! schemes. The grammar is searched for anywhere in the input (case-insensitive, starting
//! at a word boundary) rather than anchored to the whole string, so
//! `"see http://example.com now"` is accepted and yields the embedded URL. Callers that
//! need the input to be exactly a URL compare the match against the input:
//!
//! ```
//! use auditor::format::match_url;
//!
//! let input = "see http://example.com now";
//! assert_eq!(match_url(input), Some("http://example.com"));
//! assert_ne!(match_url(input), Some(input));
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

const SCHEME: &str = r"(?P<scheme>https?)://";

const USERINFO: &str = r"(?:(?P<userinfo>(?:[-_.!~*'()a-zA-Z0-9;:&=+$,]|%[0-9A-Fa-f]{2})*)@)?";

const DOMAIN_LABEL: &str = r"[a-zA-Z0-9](?:[-a-zA-Z0-9]*[a-zA-Z0-9])?";

const TOP_LABEL: &str = r"[a-zA-Z](?:[-a-zA-Z0-9]*[a-zA-Z0-9])?";

const IPV4: &str = r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+";

const PORT: &str = r"(?::(?P<port>[0-9]*))?";

/// One path character: unreserved, a few reserved, or a percent escape.
const PCHAR: &str = r"(?:[-_.!~*'()a-zA-Z0-9:@&=+$,]|%[0-9A-Fa-f]{2})";

/// Query and fragment characters.
const URIC: &str = r"(?:[;:@&=+$,?a-zA-Z0-9/_.!~*'()-]|%[0-9A-Fa-f]{2})*";

fn grammar() -> String {
    let hostname = format!(r"(?:{DOMAIN_LABEL}\.)*{TOP_LABEL}\.?");
    let host = format!("(?P<host>{hostname}|{IPV4})");
    let segment = format!("{PCHAR}*(?:;{PCHAR}*)*");
    let path = format!("(?P<path>/{segment}(?:/{segment})*)?");
    let query = format!(r"(?:\?(?P<query>{URIC}))?");
    let fragment = format!("(?:#(?P<fragment>{URIC}))?");
    // ASCII-only case folding: Unicode folding would let `ſ` match `s` and `K` match `k`.
    format!(r"(?i-u)\b{SCHEME}{USERINFO}{host}{PORT}{path}{query}{fragment}")
}

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&grammar()).expect("URL grammar is valid"));

/// A URL split into its components.
///
/// Produced by [`parse_url`] and carried as the accepted value of `url` rules.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UrlParts {
    href: String,
    scheme: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    userinfo: Option<String>,
    hostname: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    port: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    path: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    query: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    fragment: Option<String>,
}

impl UrlParts {
    /// The matched URL text, exactly as it appeared in the input.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// `http` or `https`, lowercased.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The `user[:password]` part before `@`, if any.
    #[must_use]
    pub fn userinfo(&self) -> Option<&str> {
        self.userinfo.as_deref()
    }

    /// The host name or IPv4 literal, as written.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The explicit port, if one was given.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The path including its leading `/`, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The query without its leading `?`, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The fragment without its leading `#`, if any.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl fmt::Display for UrlParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

/// Search `input` for a URL and return it decomposed.
///
/// Returns `None` if no candidate is found, or if the first candidate has a single-label
/// host (`http://localhost`) or a port above 65535.
///
/// ```
/// use auditor::format::parse_url;
///
/// let url = parse_url("https://user@api.example.com:8443/v1/items?id=7#top").unwrap();
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.userinfo(), Some("user"));
/// assert_eq!(url.hostname(), "api.example.com");
/// assert_eq!(url.port(), Some(8443));
/// assert_eq!(url.path(), Some("/v1/items"));
/// assert_eq!(url.query(), Some("id=7"));
/// assert_eq!(url.fragment(), Some("top"));
///
/// assert!(parse_url("http://localhost/").is_none());
/// ```
#[must_use]
pub fn parse_url(input: &str) -> Option<UrlParts> {
    let caps = URL.captures(input)?;
    let port = validated_port(&caps)?;
    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    Some(UrlParts {
        href: caps.get(0)?.as_str().to_string(),
        scheme: caps.name("scheme")?.as_str().to_ascii_lowercase(),
        userinfo: group("userinfo"),
        hostname: caps.name("host")?.as_str().to_string(),
        port,
        path: group("path"),
        query: group("query"),
        fragment: group("fragment"),
    })
}

/// Search `input` for a URL and return the matched text.
///
/// Same acceptance rules as [`parse_url`].
#[must_use]
pub fn match_url(input: &str) -> Option<&str> {
    let caps = URL.captures(input)?;
    validated_port(&caps)?;
    caps.get(0).map(|m| m.as_str())
}

/// Returns `true` if [`match_url`] finds a URL.
#[must_use]
pub fn is_url(input: &str) -> bool {
    match_url(input).is_some()
}

/// Structural checks the grammar cannot express.
///
/// Returns `None` when the candidate is rejected, `Some(port)` otherwise (the inner
/// `Option` is the parsed port, absent when none or an empty one was written).
fn validated_port(caps: &Captures<'_>) -> Option<Option<u16>> {
    caps.name("scheme")?;

    let host = caps.name("host")?.as_str();
    if host.split('.').filter(|label| !label.is_empty()).count() < 2 {
        return None;
    }

    match caps.name("port").map(|m| m.as_str()) {
        None | Some("") => Some(None),
        Some(digits) => digits.parse::<u16>().ok().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_urls() {
        for url in [
            "http://example.com",
            "https://example.com/",
            "https://www.example.co.uk/path/to/page.html",
            "http://example.com:8080/",
            "http://192.168.0.1/admin",
            "HTTPS://EXAMPLE.COM/UPPER",
            "http://example.com./trailing-dot",
        ] {
            assert!(is_url(url), "{url} should be accepted");
            assert_eq!(match_url(url), Some(url));
        }
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        for url in [
            "",
            "example.com",
            "ftp://example.com",
            "mailto:user@example.com",
            "http//example.com",
            "http://",
        ] {
            assert!(!is_url(url), "{url:?} should be rejected");
        }
    }

    #[test]
    fn requires_two_host_labels() {
        assert!(parse_url("http://localhost").is_none());
        assert!(parse_url("http://localhost:3000/").is_none());
        assert!(parse_url("http://intranet.local").is_some());
    }

    #[test]
    fn port_range_is_enforced() {
        assert_eq!(parse_url("http://example.com:0").unwrap().port(), Some(0));
        assert_eq!(
            parse_url("http://example.com:65535").unwrap().port(),
            Some(65535)
        );
        assert!(parse_url("http://example.com:65536").is_none());
        assert!(parse_url("http://example.com:99999999999999999999").is_none());
    }

    #[test]
    fn empty_port_is_no_port() {
        let url = parse_url("http://example.com:/x").unwrap();
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), Some("/x"));
    }

    #[test]
    fn scheme_is_lowercased_host_is_not() {
        let url = parse_url("HTTP://Example.COM").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.hostname(), "Example.COM");
    }

    #[test]
    fn decomposes_all_parts() {
        let url = parse_url("http://a:b@example.com:81/p/q;x?k=v&z=%20#frag").unwrap();
        assert_eq!(url.userinfo(), Some("a:b"));
        assert_eq!(url.hostname(), "example.com");
        assert_eq!(url.port(), Some(81));
        assert_eq!(url.path(), Some("/p/q;x"));
        assert_eq!(url.query(), Some("k=v&z=%20"));
        assert_eq!(url.fragment(), Some("frag"));
        assert_eq!(url.href(), "http://a:b@example.com:81/p/q;x?k=v&z=%20#frag");
    }

    #[test]
    fn absent_parts_are_none() {
        let url = parse_url("https://example.com").unwrap();
        assert_eq!(url.userinfo(), None);
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), None);
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn search_is_unanchored() {
        let input = "visit http://example.com/docs today";
        assert_eq!(match_url(input), Some("http://example.com/docs"));
        assert_eq!(parse_url(input).unwrap().path(), Some("/docs"));
    }

    #[test]
    fn case_folding_is_ascii_only() {
        assert!(parse_url("http\u{17F}://example.com/").is_none());
        assert!(parse_url("HTTP\u{17F}://example.com/").is_none());
        assert!(match_url("http://\u{212A}ey.example.com/").is_none());
        assert!(match_url("http://ke\u{212A}.example.com/").is_none());
    }

    #[test]
    fn word_boundary_is_ascii() {
        assert_eq!(
            match_url("\u{e9}http://example.com"),
            Some("http://example.com")
        );
        assert_eq!(
            match_url("\u{4e2d}https://example.com/x"),
            Some("https://example.com/x")
        );
        assert!(match_url("xhttp://example.com").is_none());
    }

    #[test]
    fn match_stops_at_first_invalid_character() {
        assert_eq!(
            match_url("http://example.com/a b"),
            Some("http://example.com/a")
        );
    }
}
