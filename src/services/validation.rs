//! Input validation helpers shared by the services
//!
//! Checks return plain booleans; each service turns a failed check into its
//! own `ValidationError` with the message shown to the visitor.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

/// French phone number: +33 or 0, then nine digits, the first non-zero
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+33|0)[1-9](\d{2}){4}$").expect("valid phone regex"));

/// Loose email shape check (`local@domain.tld`)
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Slugs are lowercase ASCII letters, digits and hyphens
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Absolute http(s) URL
pub fn is_http_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Phone number check. Spaces are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(&strip_spaces(phone))
}

pub fn strip_spaces(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Length in characters, not bytes ("é" counts once)
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Whether the trimmed value has between `min` and `max` characters
pub fn len_between(value: &str, min: usize, max: usize) -> bool {
    let len = char_len(value.trim());
    len >= min && len <= max
}

/// Trim an optional string, mapping blank values to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("contact@jcpc.fr"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
        assert!(!is_valid_email("contact@jcpc"));
        assert!(!is_valid_email("contact jcpc@x.fr"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_slug() {
        assert!(is_valid_slug("writeup-404ctf-2025"));
        assert!(!is_valid_slug("Writeup"));
        assert!(!is_valid_slug("write_up"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_url() {
        assert!(is_http_url("https://www.linkedin.com/in/someone"));
        assert!(is_http_url("http://ctf.example.org"));
        assert!(!is_http_url("ftp://example.org"));
        assert!(!is_http_url("linkedin.com/in/someone"));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("0612345678"));
        assert!(is_valid_phone("06 12 34 56 78"));
        assert!(is_valid_phone("+33612345678"));
        assert!(!is_valid_phone("0012345678"));
        assert!(!is_valid_phone("061234567"));
        assert!(!is_valid_phone("+3361234567"));
    }

    #[test]
    fn test_lengths_count_chars() {
        assert_eq!(char_len("Événement"), 9);
        assert!(len_between("  ab  ", 2, 100));
        assert!(!len_between("a", 2, 100));
        assert!(!len_between(&"x".repeat(101), 2, 100));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
