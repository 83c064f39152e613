//! Cookie parsing and `Set-Cookie` rendering for the request gate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request cookies by name.
pub type CookieJar = BTreeMap<String, String>;

/// Parses a `Cookie` request header (`a=1; b=2`).
///
/// Pairs without `=` or with an empty name are skipped; a repeated name keeps
/// the first value, as browsers send the most specific cookie first.
pub fn parse_cookie_header(header: &str) -> CookieJar {
    let mut jar = CookieJar::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        jar.entry(name.to_string())
            .or_insert_with(|| value.trim().trim_matches('"').to_string());
    }
    jar
}

/// One cookie the response must set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: Option<u64>,
    pub http_only: bool,
    pub secure: bool,
}

impl SetCookie {
    /// Cookie scoped to the whole site with no expiry.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age_secs: None,
            http_only: false,
            secure: false,
        }
    }

    pub fn max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Renders the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut rendered = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(max_age) = self.max_age_secs {
            rendered.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.http_only {
            rendered.push_str("; HttpOnly");
        }
        if self.secure {
            rendered.push_str("; Secure");
        }
        rendered.push_str("; SameSite=Lax");
        rendered
    }
}
