use mandalart_core::auth::session::{Session, SessionCheck, SessionError, SessionVerifier};
use mandalart_core::routing::cookie::{CookieJar, SetCookie};
use mandalart_core::routing::gate::RedirectReason;
use mandalart_core::{GateDecision, GateRequest, RequestGate, RoutingConfig};
use std::cell::Cell as Counter;
use uuid::Uuid;

/// Verifier stub with a fixed answer and a call counter.
struct StubVerifier {
    outcome: Result<SessionCheck, SessionError>,
    calls: Counter<usize>,
}

impl StubVerifier {
    fn anonymous() -> Self {
        Self::with(Ok(SessionCheck::anonymous()))
    }

    fn signed_in(refreshed: Vec<SetCookie>) -> Self {
        let mut check = SessionCheck::signed_in(Session {
            user_id: Uuid::new_v4(),
            email: Some("user@example.com".to_string()),
            expires_at: i64::MAX,
        });
        check.refreshed_cookies = refreshed;
        Self::with(Ok(check))
    }

    fn failing() -> Self {
        Self::with(Err(SessionError::Provider("timeout".to_string())))
    }

    fn with(outcome: Result<SessionCheck, SessionError>) -> Self {
        Self {
            outcome,
            calls: Counter::new(0),
        }
    }
}

impl SessionVerifier for StubVerifier {
    fn verify(&self, _cookies: &CookieJar) -> Result<SessionCheck, SessionError> {
        self.calls.set(self.calls.get() + 1);
        self.outcome.clone()
    }
}

fn gate(verifier: &StubVerifier) -> RequestGate<&StubVerifier> {
    RequestGate::new(RoutingConfig::default(), verifier).unwrap()
}

fn redirect_to(decision: GateDecision) -> (String, RedirectReason) {
    match decision {
        GateDecision::Redirect { location, reason } => (location, reason),
        other => panic!("expected redirect, got {other:?}"),
    }
}

#[test]
fn static_assets_pass_through_without_session_check() {
    let verifier = StubVerifier::anonymous();
    let gate = gate(&verifier);

    for path in [
        "/_next/static/chunk.js",
        "/api/cells",
        "/favicon.ico",
        "/ko/images/logo.png",
        "/robots.txt",
    ] {
        assert_eq!(
            gate.handle(&GateRequest::new(path)),
            GateDecision::PassThrough,
            "{path}"
        );
    }
    assert_eq!(verifier.calls.get(), 0);
}

#[test]
fn dotted_page_paths_still_require_a_session() {
    let verifier = StubVerifier::anonymous();
    let gate = gate(&verifier);

    for path in ["/ko/mandalart/board.v2", "/ko/app/report.final", "/ko/v1.2/board"] {
        let (location, reason) = redirect_to(gate.handle(&GateRequest::new(path)));
        assert_eq!(location, "/ko/login", "{path}");
        assert_eq!(reason, RedirectReason::LoginRequired, "{path}");
    }
    assert_eq!(verifier.calls.get(), 3);
}

#[test]
fn static_extension_match_ignores_case_and_follows_config() {
    let verifier = StubVerifier::anonymous();
    assert_eq!(
        gate(&verifier).handle(&GateRequest::new("/ko/images/Logo.SVG")),
        GateDecision::PassThrough
    );

    let mut config = RoutingConfig::default();
    config.static_extensions.retain(|ext| ext != "txt");
    let narrowed = RequestGate::new(config, &verifier).unwrap();
    let (location, _) = redirect_to(narrowed.handle(&GateRequest::new("/ko/notes.txt")));
    assert_eq!(location, "/ko/login");
}

#[test]
fn deprecated_alias_redirects_to_canonical_locale_keeping_query() {
    let verifier = StubVerifier::anonymous();
    let (location, reason) = redirect_to(
        gate(&verifier).handle(&GateRequest::new("/kr/app/board").with_query("cell=1")),
    );
    assert_eq!(location, "/ko/app/board?cell=1");
    assert_eq!(reason, RedirectReason::DeprecatedLocale);
}

#[test]
fn missing_locale_uses_cookie_then_header_then_default() {
    let verifier = StubVerifier::anonymous();
    let gate = gate(&verifier);

    let from_cookie = redirect_to(
        gate.handle(
            &GateRequest::new("/app")
                .with_cookie("MANDALART_LOCALE", "en")
                .with_accept_language("ko-KR,ko;q=0.9"),
        ),
    );
    assert_eq!(from_cookie, ("/en/app".to_string(), RedirectReason::MissingLocale));

    let from_header = redirect_to(
        gate.handle(&GateRequest::new("/app").with_accept_language("fr;q=0.9,en-US;q=0.8")),
    );
    assert_eq!(from_header.0, "/en/app");

    let from_default = redirect_to(gate.handle(&GateRequest::new("/")));
    assert_eq!(from_default.0, "/ko");
}

#[test]
fn wrong_case_locale_prefix_is_canonicalized() {
    let verifier = StubVerifier::anonymous();
    let (location, reason) = redirect_to(gate(&verifier).handle(&GateRequest::new("/EN/login")));
    assert_eq!(location, "/en/login");
    assert_eq!(reason, RedirectReason::NonCanonicalLocale);
}

#[test]
fn public_paths_allow_without_session() {
    let verifier = StubVerifier::anonymous();
    let gate = gate(&verifier);

    for path in ["/ko", "/ko/login", "/en/signup", "/ko/auth/callback/"] {
        let decision = gate.handle(&GateRequest::new(path).with_cookie("MANDALART_LOCALE", "ko"));
        match decision {
            GateDecision::Allow { .. } => {}
            other => panic!("{path}: expected allow, got {other:?}"),
        }
    }
    assert_eq!(verifier.calls.get(), 0);
}

#[test]
fn protected_path_without_session_redirects_to_localized_login() {
    let verifier = StubVerifier::anonymous();
    let (location, reason) = redirect_to(gate(&verifier).handle(&GateRequest::new("/en/app")));
    assert_eq!(location, "/en/login");
    assert_eq!(reason, RedirectReason::LoginRequired);
    assert_eq!(verifier.calls.get(), 1);
}

#[test]
fn signed_in_request_forwards_refreshed_cookies_and_sets_locale_cookie() {
    let refreshed = SetCookie::new("sb-access-token", "rotated").http_only();
    let verifier = StubVerifier::signed_in(vec![refreshed.clone()]);

    let decision = gate(&verifier).handle(&GateRequest::new("/en/app"));
    match decision {
        GateDecision::Allow {
            locale,
            set_cookies,
        } => {
            assert_eq!(locale, "en");
            assert_eq!(set_cookies.len(), 2);
            assert_eq!(set_cookies[0].name, "MANDALART_LOCALE");
            assert_eq!(set_cookies[0].value, "en");
            assert_eq!(set_cookies[1], refreshed);
        }
        other => panic!("expected allow, got {other:?}"),
    }
}

#[test]
fn session_error_allows_request_through() {
    let verifier = StubVerifier::failing();
    let decision = gate(&verifier)
        .handle(&GateRequest::new("/ko/app").with_cookie("MANDALART_LOCALE", "ko"));
    assert_eq!(
        decision,
        GateDecision::Allow {
            locale: "ko".to_string(),
            set_cookies: Vec::new(),
        }
    );
}
