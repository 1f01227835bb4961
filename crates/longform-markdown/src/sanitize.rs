#![forbid(unsafe_code)]

//! Destination sanitizing for links and images.
//!
//! Scheme allow-list rather than block-list: `http`, `https`, `mailto`,
//! plus scheme-less targets (relative paths, fragments, protocol-relative
//! URLs). `data:` survives only for images (`data:image/...`). Anything
//! else, and anything carrying control characters, is rejected. A
//! rejected destination does not drop the node; the link renders as
//! plain text with `href: None`.

/// Sanitize a link or image destination.
///
/// Returns the trimmed destination when it is acceptable, `None` when it
/// must not be emitted. Scheme matching is case-insensitive, so
/// `JaVaScRiPt:` does not slip through, and control characters anywhere
/// in the input (the classic `java\tscript:` disguise) reject it.
pub fn sanitize_href(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().any(char::is_control) {
        return None;
    }

    match scheme_of(trimmed) {
        None => Some(trimmed.to_string()),
        Some(scheme) => {
            let scheme = scheme.to_ascii_lowercase();
            match scheme.as_str() {
                "http" | "https" | "mailto" => Some(trimmed.to_string()),
                "data" => {
                    let rest = &trimmed[scheme.len() + 1..];
                    if rest.len() >= 6 && rest[..6].eq_ignore_ascii_case("image/") {
                        Some(trimmed.to_string())
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
    }
}

/// The scheme portion of `url`, if it has one. A `:` only introduces a
/// scheme when it appears before any `/`, `?` or `#`.
fn scheme_of(url: &str) -> Option<&str> {
    let colon = url.find(':')?;
    if let Some(delim) = url.find(['/', '?', '#']) {
        if delim < colon {
            return None;
        }
    }
    let scheme = &url[..colon];
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
    {
        return None;
    }
    Some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn web_schemes_pass() {
        assert_eq!(
            sanitize_href("https://example.com/a"),
            Some("https://example.com/a".to_string())
        );
        assert_eq!(
            sanitize_href("http://example.com"),
            Some("http://example.com".to_string())
        );
        assert_eq!(
            sanitize_href("mailto:a@example.com"),
            Some("mailto:a@example.com".to_string())
        );
    }

    #[test]
    fn schemeless_targets_pass() {
        assert!(sanitize_href("/notes/12").is_some());
        assert!(sanitize_href("#heading").is_some());
        assert!(sanitize_href("../up").is_some());
        assert!(sanitize_href("//cdn.example.com/x.png").is_some());
        // A colon later in the path is not a scheme.
        assert!(sanitize_href("/search?q=a:b").is_some());
    }

    #[test]
    fn script_schemes_are_rejected_in_any_case() {
        assert_eq!(sanitize_href("javascript:alert(1)"), None);
        assert_eq!(sanitize_href("JaVaScRiPt:alert(1)"), None);
        assert_eq!(sanitize_href("vbscript:msgbox"), None);
    }

    #[test]
    fn control_characters_reject() {
        assert_eq!(sanitize_href("java\tscript:alert(1)"), None);
        assert_eq!(sanitize_href("java\nscript:alert(1)"), None);
        assert_eq!(sanitize_href("https://example.com/\u{0}"), None);
    }

    #[test]
    fn data_urls_only_for_images() {
        assert!(sanitize_href("data:image/png;base64,AAAA").is_some());
        assert!(sanitize_href("DATA:IMAGE/gif;base64,AAAA").is_some());
        assert_eq!(sanitize_href("data:text/html,<script>"), None);
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        assert_eq!(sanitize_href("file:///etc/passwd"), None);
        assert_eq!(sanitize_href("ftp://host/file"), None);
    }

    #[test]
    fn empty_and_whitespace_reject() {
        assert_eq!(sanitize_href(""), None);
        assert_eq!(sanitize_href("   "), None);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            sanitize_href("  https://example.com  "),
            Some("https://example.com".to_string())
        );
    }

    proptest! {
        #[test]
        fn accepted_destinations_are_clean(raw in ".*") {
            if let Some(href) = sanitize_href(&raw) {
                prop_assert_eq!(href.as_str(), raw.trim());
                prop_assert!(!href.chars().any(char::is_control));
                let lower = href.to_ascii_lowercase();
                prop_assert!(!lower.starts_with("javascript:"));
                prop_assert!(!lower.starts_with("vbscript:"));
            }
        }

        #[test]
        fn script_schemes_never_survive(tail in ".*") {
            prop_assert_eq!(sanitize_href(&format!("javascript:{tail}")), None);
        }
    }
}
