//! Input sanitizers applied at the API boundary.
//!
//! Every function here is pure and total: malformed input is normalized or
//! rejected through the return value, never through a panic or an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::pickup::ASAP;

/// Maximum length of a sanitized filename.
pub const MAX_FILENAME_LENGTH: usize = 255;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

static PICKUP_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} at \d{1,2}:\d{2} (AM|PM)$").expect("Invalid regex")
});

/// Escape the five HTML-significant characters.
///
/// `&` is replaced first so entities introduced by later replacements are not
/// escaped twice.
#[must_use]
pub fn escape_html(unsafe_text: &str) -> String {
    unsafe_text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Permissive syntactic email check: `local@domain.tld` with no whitespace
/// and exactly one `@`.
///
/// This is not RFC 5322 validation. It only rejects input that is obviously
/// not an address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Loose phone number check for contact forms.
///
/// Accepts digits plus common separators (`+ - ( ) .` and spaces) as long as
/// there are between 7 and 15 digits, the E.164 maximum.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.');
    if !phone.chars().all(allowed) {
        return false;
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

/// Make an uploaded filename safe to use as a single path segment.
///
/// - every character outside `[a-zA-Z0-9.-]` becomes `_`
/// - runs of `.` collapse to a single `.`
/// - one leading `.` is stripped
/// - the result is truncated to [`MAX_FILENAME_LENGTH`] characters
///
/// The output contains no `/`, `\` or `..`, so it cannot escape the
/// directory it is joined onto.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    for c in filename.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            c
        } else {
            '_'
        };
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.strip_prefix('.').unwrap_or(&out);
    // Only ASCII survives the replacement, so byte and char lengths agree.
    trimmed.chars().take(MAX_FILENAME_LENGTH).collect()
}

/// Normalize an untrusted pickup time string.
///
/// Returns the trimmed input when it is exactly `ASAP` or matches
/// `YYYY-MM-DD at H:MM AM|PM`; anything else (missing, empty, injection
/// attempts) collapses to `ASAP`.
#[must_use]
pub fn sanitize_pickup_time(pickup_time: Option<&str>) -> String {
    let Some(raw) = pickup_time else {
        return ASAP.to_string();
    };

    let trimmed = raw.trim();
    if trimmed == ASAP || PICKUP_TIME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        ASAP.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_all_entities() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom's & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom&#039;s &amp; Jerry&#039;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_html_does_not_double_escape() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("<"), "&lt;");
    }

    #[test]
    fn test_escape_html_plain_text_unchanged() {
        assert_eq!(escape_html("ube bun"), "ube bun");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("user+tag@sub.example.co.uk"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-symbol"));
        assert!(!is_valid_email("user@domain"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("(702) 909-2253"));
        assert!(is_valid_phone("+1 702.909.2253"));
        assert!(is_valid_phone("7029092253"));

        assert!(!is_valid_phone("123"));
        assert!(!is_valid_phone("call me maybe"));
        assert!(!is_valid_phone("702-909-2253; DROP TABLE"));
        assert!(!is_valid_phone("1234567890123456"));
    }

    #[test]
    fn test_sanitize_filename_path_traversal() {
        let sanitized = sanitize_filename("../../etc/passwd");
        assert!(!sanitized.contains('/'));
        assert!(!sanitized.contains(".."));
        assert_eq!(sanitized, "_._etc_passwd");
    }

    #[test]
    fn test_sanitize_filename_windows_separators() {
        let sanitized = sanitize_filename("..\\..\\boot.ini");
        assert!(!sanitized.contains('\\'));
        assert!(!sanitized.contains(".."));
    }

    #[test]
    fn test_sanitize_filename_keeps_safe_names() {
        assert_eq!(sanitize_filename("croissant-01.jpg"), "croissant-01.jpg");
    }

    #[test]
    fn test_sanitize_filename_replaces_spaces_and_unicode() {
        assert_eq!(sanitize_filename("my photo é.png"), "my_photo__.png");
    }

    #[test]
    fn test_sanitize_filename_strips_leading_dot() {
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename("...hidden"), "hidden");
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = format!("{}.jpg", "a".repeat(400));
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn test_sanitize_pickup_time_valid_scheduled() {
        assert_eq!(
            sanitize_pickup_time(Some("2025-03-01 at 2:00 PM")),
            "2025-03-01 at 2:00 PM"
        );
        assert_eq!(
            sanitize_pickup_time(Some("  2025-03-01 at 08:30 AM  ")),
            "2025-03-01 at 08:30 AM"
        );
    }

    #[test]
    fn test_sanitize_pickup_time_asap() {
        assert_eq!(sanitize_pickup_time(Some("ASAP")), "ASAP");
        assert_eq!(sanitize_pickup_time(Some(" ASAP ")), "ASAP");
    }

    #[test]
    fn test_sanitize_pickup_time_rejects_garbage() {
        assert_eq!(sanitize_pickup_time(Some("<script>")), "ASAP");
        assert_eq!(sanitize_pickup_time(Some("")), "ASAP");
        assert_eq!(sanitize_pickup_time(None), "ASAP");
        assert_eq!(
            sanitize_pickup_time(Some("2025-03-01 (time not selected)")),
            "ASAP"
        );
        assert_eq!(
            sanitize_pickup_time(Some("2025-03-01 at 2:00 PM<img src=x>")),
            "ASAP"
        );
    }
}
