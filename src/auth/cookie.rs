//! Defines functions for storing the backend's bearer token in a private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

/// The name of the cookie holding the bearer token.
pub(crate) const COOKIE_TOKEN: &str = "token";

/// Add the auth cookie holding `token` to the cookie jar.
///
/// Without `duration` the cookie lasts until the browser is closed, otherwise
/// it expires `duration` from now. The backend decides how long the token
/// itself stays valid.
///
/// Returns the cookie jar with the cookie added.
pub(crate) fn set_auth_cookie(
    jar: PrivateCookieJar,
    token: &str,
    duration: Option<Duration>,
) -> PrivateCookieJar {
    let mut cookie = Cookie::build((COOKIE_TOKEN, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build();

    if let Some(duration) = duration {
        cookie.set_expires(OffsetDateTime::now_utc() + duration);
    }

    jar.add(cookie)
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub(crate) fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the bearer token from the auth cookie, if there is a usable one.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(COOKIE_TOKEN)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|token| !token.is_empty() && token != "deleted")
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::{Key, SameSite}};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use super::{COOKIE_TOKEN, get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie};

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn can_set_cookie() {
        let jar = set_auth_cookie(get_jar(), "abc123", None);

        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.expires_datetime(), None);
        assert_eq!(get_token_from_cookies(&jar), Some("abc123".to_owned()));
    }

    #[test]
    fn can_set_cookie_with_duration() {
        let jar = set_auth_cookie(get_jar(), "abc123", Some(Duration::days(7)));

        let expires = jar
            .get(COOKIE_TOKEN)
            .and_then(|cookie| cookie.expires_datetime())
            .unwrap();
        let want = OffsetDateTime::now_utc() + Duration::days(7);
        assert!((expires - want).abs() < Duration::seconds(1));
    }

    #[test]
    fn invalidate_auth_cookie_succeeds() {
        let jar = set_auth_cookie(get_jar(), "abc123", None);

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_token_from_cookies(&jar), None);
    }

    #[test]
    fn missing_cookie_has_no_token() {
        assert_eq!(get_token_from_cookies(&get_jar()), None);
    }
}
