//! Email address grammars.
//!
//! `local-part@domain`, where the local part is a dot-atom or a quoted string and the
//! domain is a dot-atom or a bracketed domain literal. Both grammars anchor the whole
//! input.

use std::sync::LazyLock;

use regex::Regex;

/// atext: `a-z A-Z 0-9 ! # $ % & ' * + - / = ? ^ _ ` { | } ~`
const ATEXT: &str = r"[-a-zA-Z0-9!#$%&'*+/=?^_`{|}~]";

/// Printable ASCII except `[`, `\` and `]`.
const DOMAIN_LITERAL: &str = r"\[[\x21-\x5a\x5e-\x7e]*\]";

/// Double-quoted string; backslash escapes any character but CR/LF.
const QUOTED_STRING: &str = r#""(?:\\[^\r\n]|[^\\"\r\n])*""#;

fn dot_atom() -> String {
    format!("(?:{ATEXT}+(?:\\.{ATEXT}+)*)")
}

/// Dots may repeat or trail, but the atom still starts with atext.
fn dot_atom_loose() -> String {
    format!("(?:{ATEXT}+(?:\\.|{ATEXT})*)")
}

fn grammar(local_atom: &str) -> String {
    let dot_atom = dot_atom();
    format!("^(?:{local_atom}|{QUOTED_STRING})@(?:{dot_atom}|{DOMAIN_LITERAL})$")
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&grammar(&dot_atom())).expect("strict email grammar is valid"));

static EMAIL_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&grammar(&dot_atom_loose())).expect("loose email grammar is valid")
});

/// Strict email check.
///
/// ```
/// use auditor::format::is_email;
///
/// assert!(is_email("user.name+tag@example.com"));
/// assert!(!is_email("a..b@example.com"));
/// ```
#[must_use]
pub fn is_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

/// Loose email check: the local part may contain consecutive or trailing dots, as some
/// legacy mail providers issued such addresses.
///
/// ```
/// use auditor::format::is_email_loose;
///
/// assert!(is_email_loose("a..b@example.com"));
/// assert!(is_email_loose("trailing.@example.com"));
/// assert!(!is_email_loose(".leading@example.com"));
/// ```
#[must_use]
pub fn is_email_loose(input: &str) -> bool {
    EMAIL_LOOSE.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accepts_common_addresses() {
        for addr in [
            "user@example.com",
            "first.last@sub.example.co.jp",
            "user+tag@example.com",
            "o'brien@example.ie",
            "x@localhost",
            "{weird}|~chars@example.org",
        ] {
            assert!(is_email(addr), "{addr} should be valid");
        }
    }

    #[test]
    fn strict_accepts_quoted_local_part() {
        assert!(is_email(r#""john doe"@example.com"#));
        assert!(is_email(r#""a\"b"@example.com"#));
        assert!(is_email(r#""a.@..b"@example.com"#));
    }

    #[test]
    fn strict_accepts_domain_literal() {
        assert!(is_email("user@[192.168.0.1]"));
        assert!(is_email("user@[IPv6:2001:db8::1]"));
        assert!(!is_email("user@[bad]bracket]"));
    }

    #[test]
    fn strict_rejects_dot_misuse() {
        assert!(!is_email("a..b@example.com"));
        assert!(!is_email(".a@example.com"));
        assert!(!is_email("a.@example.com"));
        assert!(!is_email("user@example..com"));
        assert!(!is_email("user@.example.com"));
    }

    #[test]
    fn strict_rejects_malformed() {
        for addr in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@@example.com",
            "user name@example.com",
            "user@exa mple.com",
            "user@example.com\n",
            " user@example.com",
        ] {
            assert!(!is_email(addr), "{addr:?} should be invalid");
        }
    }

    #[test]
    fn loose_relaxes_only_the_local_part() {
        assert!(is_email_loose("a..b@example.com"));
        assert!(is_email_loose("a.@example.com"));
        assert!(is_email_loose("a...@example.com"));
        assert!(!is_email_loose(".a@example.com"));
        assert!(!is_email_loose("a@example..com"));
        assert!(!is_email_loose("a@example.com."));
    }

    #[test]
    fn loose_accepts_everything_strict_accepts() {
        for addr in [
            "user@example.com",
            r#""john doe"@example.com"#,
            "user@[10.0.0.1]",
        ] {
            assert!(is_email(addr));
            assert!(is_email_loose(addr));
        }
    }
}
