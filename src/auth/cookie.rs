//! Session cookie plumbing: `Set-Cookie` values for login/logout and reading
//! the token back out of the `Cookie` header.

use axum::http::{header, HeaderMap};
use std::time::Duration;

use crate::config::{CookieConfig, SameSite};

pub fn session_cookie(cfg: &CookieConfig, token: &str, max_age: Duration) -> String {
    build(cfg, token, max_age.as_secs())
}

/// Expires the session cookie on the client. The token itself stays valid
/// until its own expiry.
pub fn clear_cookie(cfg: &CookieConfig) -> String {
    build(cfg, "", 0)
}

fn build(cfg: &CookieConfig, value: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite={}",
        cfg.name,
        value,
        max_age,
        cfg.same_site.as_str()
    );
    if cfg.secure || cfg.same_site == SameSite::None {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of the cookie called `name`, if the request carries one.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}
