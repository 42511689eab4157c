//! Auth handlers.

pub(crate) mod accept_invite;
pub(crate) mod change_password;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod refresh;
pub(crate) mod reset_confirm;
pub(crate) mod reset_request;

use furlough_app::domain::sessions::records::SessionTokens;
use jiff::Timestamp;
use salvo::{
    Response,
    http::cookie::{Cookie, SameSite, time::Duration},
};

/// Cookie carrying the opaque refresh token, scoped to the auth routes so
/// only refresh and logout ever see it.
pub(crate) const REFRESH_COOKIE: &str = "furlough_refresh";

pub(crate) const AUTH_COOKIE_PATH: &str = "/api/v1/auth";

pub(crate) fn set_refresh_cookie(res: &mut Response, tokens: &SessionTokens, now: Timestamp) {
    let max_age_secs = (tokens.refresh_expires_at.as_second() - now.as_second()).max(0);

    let cookie = Cookie::build((REFRESH_COOKIE, tokens.refresh_token.clone()))
        .path(AUTH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_secs))
        .build();

    res.add_cookie(cookie);
}

pub(crate) fn clear_refresh_cookie(res: &mut Response) {
    let cookie = Cookie::build((REFRESH_COOKIE, String::new()))
        .path(AUTH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(0))
        .build();

    res.add_cookie(cookie);
}
