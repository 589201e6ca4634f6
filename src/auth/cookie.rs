//! Refresh token cookie

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::Config;
use crate::error::{Error, Result};

/// Builds and reads the httpOnly cookie that carries the refresh token.
///
/// Outside debug mode the cookie is `Secure` with `SameSite=None`; in debug
/// mode it drops `Secure` and uses `SameSite=Lax` so plain-http development
/// servers still receive it.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    name: String,
    path: String,
    max_age: i64,
    debug: bool,
}

impl CookiePolicy {
    pub fn new(config: &Config) -> Self {
        Self {
            name: config.cookie.name.clone(),
            path: config.cookie.path.clone(),
            max_age: config.jwt.refresh_token_lifetime_secs,
            debug: config.server.debug,
        }
    }

    fn same_site(&self) -> &'static str {
        if self.debug {
            "Lax"
        } else {
            "None"
        }
    }

    /// `Set-Cookie` value holding a refresh token
    pub fn refresh_cookie(&self, token: &str) -> Result<HeaderValue> {
        let mut cookie = format!(
            "{}={}; HttpOnly; Max-Age={}; Path={}; SameSite={}",
            self.name,
            token,
            self.max_age,
            self.path,
            self.same_site()
        );
        if !self.debug {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| Error::Other(format!("Invalid refresh cookie: {}", e)))
    }

    /// `Set-Cookie` value that deletes the refresh cookie at its scoped path
    pub fn clear_cookie(&self) -> Result<HeaderValue> {
        let cookie = format!(
            "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path={}",
            self.name, self.path
        );
        HeaderValue::from_str(&cookie)
            .map_err(|e| Error::Other(format!("Invalid refresh cookie: {}", e)))
    }

    /// Refresh token from the request's `Cookie` headers, if any
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(debug: bool) -> CookiePolicy {
        let mut config = Config::default();
        config.server.debug = debug;
        CookiePolicy::new(&config)
    }

    #[test]
    fn test_production_cookie_attributes() {
        let value = policy(false).refresh_cookie("abc.def.ghi").unwrap();
        let value = value.to_str().unwrap();

        assert!(value.starts_with("app_refresh=abc.def.ghi;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Secure"));
        assert!(value.contains("SameSite=None"));
        assert!(value.contains("Max-Age=86400"));
        assert!(value.contains("Path=/api/token/refresh/"));
    }

    #[test]
    fn test_debug_cookie_attributes() {
        let value = policy(true).refresh_cookie("abc").unwrap();
        let value = value.to_str().unwrap();

        assert!(value.contains("HttpOnly"));
        assert!(!value.contains("Secure"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/api/token/refresh/"));
    }

    #[test]
    fn test_clear_cookie() {
        let value = policy(false).clear_cookie().unwrap();
        let value = value.to_str().unwrap();

        assert!(value.starts_with("app_refresh=;"));
        assert!(value.contains("Max-Age=0"));
        assert!(value.contains("Path=/api/token/refresh/"));
    }

    #[test]
    fn test_read_cookie() {
        let policy = policy(false);
        let mut headers = HeaderMap::new();
        assert_eq!(policy.read(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; app_refresh=tok.en.value; other=1"),
        );
        assert_eq!(policy.read(&headers).as_deref(), Some("tok.en.value"));
    }

    #[test]
    fn test_read_ignores_empty_and_lookalike_cookies() {
        let policy = policy(false);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("xapp_refresh=nope; app_refresh=\"\""),
        );
        assert_eq!(policy.read(&headers), None);
    }
}
