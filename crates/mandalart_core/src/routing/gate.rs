//! Per-request locale and session gate.
//!
//! # Responsibility
//! - Decide, for one incoming request, whether to pass it through, redirect
//!   it, or allow it with extra response cookies.
//!
//! # Invariants
//! - Static assets are never redirected.
//! - Public paths are never redirected to login.
//! - Non-public paths without a session always redirect to
//!   `/{locale}{login_path}`.
//! - A failing session check allows the request through; it is never fatal.

use crate::auth::session::SessionVerifier;
use crate::routing::cookie::{CookieJar, SetCookie};
use crate::routing::locale::{classify_prefix, detect_locale, split_first_segment, LocalePrefix};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One year, the lifetime of the locale preference cookie.
const LOCALE_COOKIE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Routing rules for the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Supported locale tags in canonical spelling.
    pub supported_locales: Vec<String>,
    pub default_locale: String,
    /// Deprecated first segment -> canonical locale (`kr` -> `ko`).
    pub deprecated_aliases: BTreeMap<String, String>,
    /// Path prefixes served without locale or session handling.
    pub static_prefixes: Vec<String>,
    /// File extensions (without `.`) served as static assets anywhere.
    pub static_extensions: Vec<String>,
    /// Locale-less paths reachable without a session.
    pub public_paths: Vec<String>,
    /// Locale-less login path.
    pub login_path: String,
    pub locale_cookie: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            supported_locales: vec!["ko".to_string(), "en".to_string()],
            default_locale: "ko".to_string(),
            deprecated_aliases: BTreeMap::from([("kr".to_string(), "ko".to_string())]),
            static_prefixes: ["/_next", "/api", "/static", "/images", "/favicon.ico"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            static_extensions: [
                "svg", "png", "jpg", "jpeg", "gif", "webp", "avif", "ico", "txt", "xml", "css",
                "js", "map", "json", "woff", "woff2", "ttf", "webmanifest",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            public_paths: [
                "/",
                "/login",
                "/signup",
                "/auth/callback",
                "/auth/confirm",
                "/forgot-password",
                "/reset-password",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            login_path: "/login".to_string(),
            locale_cookie: "MANDALART_LOCALE".to_string(),
        }
    }
}

/// Routing configuration defects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingConfigError {
    NoSupportedLocales,
    UnsupportedDefaultLocale(String),
    UnsupportedAliasTarget { alias: String, target: String },
    InvalidPath(String),
    InvalidExtension(String),
}

impl Display for RoutingConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSupportedLocales => write!(f, "at least one locale must be supported"),
            Self::UnsupportedDefaultLocale(locale) => {
                write!(f, "default locale `{locale}` is not supported")
            }
            Self::UnsupportedAliasTarget { alias, target } => {
                write!(f, "locale alias `{alias}` points to unsupported `{target}`")
            }
            Self::InvalidPath(path) => write!(f, "routing path `{path}` must start with `/`"),
            Self::InvalidExtension(ext) => {
                write!(f, "static extension `{ext}` must be alphanumeric without `.`")
            }
        }
    }
}

impl Error for RoutingConfigError {}

impl RoutingConfig {
    pub fn validate(&self) -> Result<(), RoutingConfigError> {
        if self.supported_locales.is_empty() {
            return Err(RoutingConfigError::NoSupportedLocales);
        }
        if !self.supported_locales.contains(&self.default_locale) {
            return Err(RoutingConfigError::UnsupportedDefaultLocale(
                self.default_locale.clone(),
            ));
        }
        for (alias, target) in &self.deprecated_aliases {
            if !self.supported_locales.contains(target) {
                return Err(RoutingConfigError::UnsupportedAliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        for path in self
            .static_prefixes
            .iter()
            .chain(&self.public_paths)
            .chain(std::iter::once(&self.login_path))
        {
            if !path.starts_with('/') {
                return Err(RoutingConfigError::InvalidPath(path.clone()));
            }
        }
        if let Some(ext) = self
            .static_extensions
            .iter()
            .find(|ext| ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(RoutingConfigError::InvalidExtension(ext.clone()));
        }
        Ok(())
    }
}

/// Framework-agnostic view of one incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    pub path: String,
    /// Raw query string without `?`.
    pub query: Option<String>,
    pub accept_language: Option<String>,
    pub cookies: CookieJar,
}

impl GateRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_accept_language(mut self, header: impl Into<String>) -> Self {
        self.accept_language = Some(header.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

/// Why the gate redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    DeprecatedLocale,
    MissingLocale,
    NonCanonicalLocale,
    LoginRequired,
}

impl RedirectReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::DeprecatedLocale => "deprecated_locale",
            Self::MissingLocale => "missing_locale",
            Self::NonCanonicalLocale => "non_canonical_locale",
            Self::LoginRequired => "login_required",
        }
    }
}

/// Gate outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Static asset; serve unchanged.
    PassThrough,
    /// Answer with a temporary redirect to `location`.
    Redirect {
        location: String,
        reason: RedirectReason,
    },
    /// Serve the page in `locale`, setting `set_cookies` on the response.
    Allow {
        locale: String,
        set_cookies: Vec<SetCookie>,
    },
}

/// Locale/session gate bound to one config and one session verifier.
pub struct RequestGate<V: SessionVerifier> {
    config: RoutingConfig,
    verifier: V,
}

impl<V: SessionVerifier> RequestGate<V> {
    pub fn new(config: RoutingConfig, verifier: V) -> Result<Self, RoutingConfigError> {
        config.validate()?;
        Ok(Self { config, verifier })
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Runs the gate state machine for `request`.
    pub fn handle(&self, request: &GateRequest) -> GateDecision {
        let decision = self.decide(request);
        match &decision {
            GateDecision::PassThrough => {}
            GateDecision::Redirect { location, reason } => debug!(
                "event=gate_decision module=routing status=redirect reason={} path={} location={}",
                reason.as_str(),
                request.path,
                location
            ),
            GateDecision::Allow { locale, .. } => debug!(
                "event=gate_decision module=routing status=allow path={} locale={}",
                request.path, locale
            ),
        }
        decision
    }

    fn decide(&self, request: &GateRequest) -> GateDecision {
        let path = normalize_path(&request.path);

        if self.is_static_asset(&path) {
            return GateDecision::PassThrough;
        }

        let (first_segment, rest) = split_first_segment(&path);
        if let Some(target) = self.deprecated_alias_target(first_segment) {
            return self.redirect(target, rest, request, RedirectReason::DeprecatedLocale);
        }

        let supported = &self.config.supported_locales;
        let (locale, rest) = match classify_prefix(&path, supported) {
            LocalePrefix::Canonical { locale, rest } => (locale, rest),
            LocalePrefix::NonCanonical { locale, rest } => {
                return self.redirect(locale, rest, request, RedirectReason::NonCanonicalLocale);
            }
            LocalePrefix::Missing => {
                let locale = detect_locale(
                    request
                        .cookies
                        .get(&self.config.locale_cookie)
                        .map(String::as_str),
                    request.accept_language.as_deref(),
                    supported,
                    &self.config.default_locale,
                );
                return self.redirect(locale, &path, request, RedirectReason::MissingLocale);
            }
        };

        let mut set_cookies = self.locale_cookie_update(locale, &request.cookies);
        let stripped = if rest.is_empty() { "/" } else { rest };
        if self.is_public_path(stripped) {
            return GateDecision::Allow {
                locale: locale.to_string(),
                set_cookies,
            };
        }

        match self.verifier.verify(&request.cookies) {
            Ok(check) => {
                if check.session.is_none() {
                    return GateDecision::Redirect {
                        location: format!("/{}{}", locale, self.config.login_path),
                        reason: RedirectReason::LoginRequired,
                    };
                }
                set_cookies.extend(check.refreshed_cookies);
            }
            Err(err) => {
                warn!(
                    "event=session_check module=routing status=error path={} error={}",
                    request.path, err
                );
            }
        }

        GateDecision::Allow {
            locale: locale.to_string(),
            set_cookies,
        }
    }

    fn is_static_asset(&self, path: &str) -> bool {
        self.config
            .static_prefixes
            .iter()
            .any(|prefix| has_path_prefix(path, prefix))
            || file_extension(path).is_some_and(|ext| {
                self.config
                    .static_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    fn deprecated_alias_target(&self, segment: &str) -> Option<&str> {
        if segment.is_empty() {
            return None;
        }
        self.config
            .deprecated_aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(segment))
            .map(|(_, target)| target.as_str())
    }

    fn is_public_path(&self, stripped: &str) -> bool {
        let candidate = match stripped.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => stripped,
        };
        self.config
            .public_paths
            .iter()
            .any(|public| public == candidate)
    }

    fn locale_cookie_update(&self, locale: &str, cookies: &CookieJar) -> Vec<SetCookie> {
        let current = cookies.get(&self.config.locale_cookie).map(String::as_str);
        if current == Some(locale) {
            return Vec::new();
        }
        vec![SetCookie::new(self.config.locale_cookie.clone(), locale)
            .max_age(LOCALE_COOKIE_MAX_AGE_SECS)]
    }

    fn redirect(
        &self,
        locale: &str,
        rest: &str,
        request: &GateRequest,
        reason: RedirectReason,
    ) -> GateDecision {
        let rest = if rest == "/" { "" } else { rest };
        let mut location = format!("/{locale}{rest}");
        if let Some(query) = request.query.as_deref().filter(|query| !query.is_empty()) {
            location.push('?');
            location.push_str(query);
        }
        GateDecision::Redirect { location, reason }
    }
}

/// Ensures a leading `/` and collapses repeated slashes.
fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    } else if path.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Extension of the last path segment: `/a/logo.SVG` -> `SVG`.
fn file_extension(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// `prefix` matches whole segments: `/api` matches `/api` and `/api/x`,
/// not `/apis`.
fn has_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(remainder) => remainder.is_empty() || remainder.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        file_extension, has_path_prefix, normalize_path, RoutingConfig, RoutingConfigError,
    };

    #[test]
    fn normalize_path_collapses_slashes() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//ko//app"), "/ko/app");
        assert_eq!(normalize_path("ko/app/"), "/ko/app/");
    }

    #[test]
    fn path_prefix_matches_whole_segments() {
        assert!(has_path_prefix("/api", "/api"));
        assert!(has_path_prefix("/api/cells", "/api"));
        assert!(!has_path_prefix("/apis", "/api"));
    }

    #[test]
    fn file_extension_reads_last_segment_only() {
        assert_eq!(file_extension("/ko/images/logo.SVG"), Some("SVG"));
        assert_eq!(file_extension("/ko/mandalart/board.v2"), Some("v2"));
        assert_eq!(file_extension("/ko/v1.2/board"), None);
        assert_eq!(file_extension("/ko/.hidden"), None);
        assert_eq!(file_extension("/ko/trailing."), None);
    }

    #[test]
    fn dotted_extension_entry_is_rejected() {
        let mut config = RoutingConfig::default();
        config.static_extensions.push(".png".to_string());
        assert_eq!(
            config.validate(),
            Err(RoutingConfigError::InvalidExtension(".png".to_string()))
        );
    }

    #[test]
    fn default_config_is_valid_and_alias_targets_are_checked() {
        assert!(RoutingConfig::default().validate().is_ok());

        let mut config = RoutingConfig::default();
        config
            .deprecated_aliases
            .insert("jp".to_string(), "ja".to_string());
        assert!(matches!(
            config.validate(),
            Err(RoutingConfigError::UnsupportedAliasTarget { .. })
        ));
    }
}
