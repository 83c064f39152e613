//! Locale prefix handling and `Accept-Language` negotiation.
//!
//! # Invariants
//! - Locale tags are compared case-insensitively and returned in the
//!   canonical spelling from the supported list.
//! - Detection order: path prefix, locale cookie, `Accept-Language`,
//!   default locale.

/// Result of inspecting the first path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalePrefix<'a> {
    /// Path starts with a supported locale spelled canonically.
    Canonical { locale: &'a str, rest: &'a str },
    /// Path starts with a supported locale in a different case (`/KO/...`).
    NonCanonical { locale: &'a str, rest: &'a str },
    /// First segment is not a supported locale.
    Missing,
}

/// Splits `/segment/rest` into the first segment and the remainder
/// (`""` or starting with `/`).
pub fn split_first_segment(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(index) => (&trimmed[..index], &trimmed[index..]),
        None => (trimmed, ""),
    }
}

/// Classifies the locale prefix of `path` against `supported` tags.
pub fn classify_prefix<'a>(path: &'a str, supported: &'a [String]) -> LocalePrefix<'a> {
    let (segment, rest) = split_first_segment(path);
    if segment.is_empty() {
        return LocalePrefix::Missing;
    }
    match supported
        .iter()
        .find(|locale| locale.eq_ignore_ascii_case(segment))
    {
        Some(locale) if locale.as_str() == segment => LocalePrefix::Canonical {
            locale: locale.as_str(),
            rest,
        },
        Some(locale) => LocalePrefix::NonCanonical {
            locale: locale.as_str(),
            rest,
        },
        None => LocalePrefix::Missing,
    }
}

/// Returns the canonical supported spelling of `tag`, if supported.
pub fn match_supported<'a>(tag: &str, supported: &'a [String]) -> Option<&'a str> {
    let tag = tag.trim();
    supported
        .iter()
        .find(|locale| locale.eq_ignore_ascii_case(tag))
        .map(String::as_str)
}

/// Picks the best supported locale from an `Accept-Language` header.
///
/// Entries are ranked by `q` weight (ties keep header order). Each entry is
/// tried as a full tag, then by its primary subtag (`ko-KR` -> `ko`).
/// Entries with `q=0` are ignored.
pub fn negotiate_accept_language<'a>(header: &str, supported: &'a [String]) -> Option<&'a str> {
    let mut ranked: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let weight = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|value| value.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (weight > 0.0).then_some((tag, weight))
        })
        .collect();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

    ranked.into_iter().find_map(|(tag, _)| {
        match_supported(tag, supported).or_else(|| {
            let primary = tag.split('-').next().unwrap_or(tag);
            match_supported(primary, supported)
        })
    })
}

/// Detects the locale for a request without a locale prefix.
pub fn detect_locale<'a>(
    cookie_locale: Option<&str>,
    accept_language: Option<&str>,
    supported: &'a [String],
    default_locale: &'a str,
) -> &'a str {
    cookie_locale
        .and_then(|value| match_supported(value, supported))
        .or_else(|| accept_language.and_then(|header| negotiate_accept_language(header, supported)))
        .unwrap_or(default_locale)
}

#[cfg(test)]
mod tests {
    use super::{
        classify_prefix, detect_locale, negotiate_accept_language, split_first_segment,
        LocalePrefix,
    };

    fn supported() -> Vec<String> {
        vec!["ko".to_string(), "en".to_string()]
    }

    #[test]
    fn split_first_segment_handles_bare_and_nested_paths() {
        assert_eq!(split_first_segment("/ko"), ("ko", ""));
        assert_eq!(split_first_segment("/ko/app/1"), ("ko", "/app/1"));
        assert_eq!(split_first_segment("/"), ("", ""));
    }

    #[test]
    fn classify_prefix_distinguishes_case() {
        let supported = supported();
        assert_eq!(
            classify_prefix("/en/login", &supported),
            LocalePrefix::Canonical {
                locale: "en",
                rest: "/login"
            }
        );
        assert_eq!(
            classify_prefix("/EN/login", &supported),
            LocalePrefix::NonCanonical {
                locale: "en",
                rest: "/login"
            }
        );
        assert_eq!(classify_prefix("/login", &supported), LocalePrefix::Missing);
        assert_eq!(classify_prefix("/", &supported), LocalePrefix::Missing);
    }

    #[test]
    fn accept_language_respects_weights_and_primary_subtags() {
        let supported = supported();
        assert_eq!(
            negotiate_accept_language("fr;q=0.9, en-US;q=0.8, ko;q=0.7", &supported),
            Some("en")
        );
        assert_eq!(
            negotiate_accept_language("ko;q=0.2, en;q=0.9", &supported),
            Some("en")
        );
        assert_eq!(negotiate_accept_language("ko-KR", &supported), Some("ko"));
        assert_eq!(negotiate_accept_language("en;q=0, fr", &supported), None);
    }

    #[test]
    fn detect_locale_prefers_cookie_then_header_then_default() {
        let supported = supported();
        assert_eq!(detect_locale(Some("en"), Some("ko"), &supported, "ko"), "en");
        assert_eq!(detect_locale(Some("xx"), Some("en"), &supported, "ko"), "en");
        assert_eq!(detect_locale(None, None, &supported, "ko"), "ko");
    }
}
