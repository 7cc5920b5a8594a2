//! Session identity resolution from the `client_id` cookie
//!
//! Resolution only looks at the cookie header. Whether a matching session
//! record exists is the reconciler's concern (see [`crate::session`]).

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use regex::Regex;
use std::{fmt, sync::OnceLock};
use time::Duration;
use uuid::Uuid;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "client_id";

/// Opaque session token handed to a client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a fresh random token (UUIDv4, 36 characters)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a token presented by a client if it is well-formed
    pub fn parse(raw: &str) -> Option<Self> {
        static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TOKEN_REGEX.get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("Failed to compile token regex")
        });

        regex.is_match(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes of the issued session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Send the cookie over secure transport only
    pub secure: bool,
    /// Cookie lifetime
    pub max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            max_age: Duration::days(365),
        }
    }
}

/// Outcome of resolving a request's identity
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub token: SessionToken,
    /// The token was minted for this request
    pub is_new: bool,
}

/// Resolves the caller's session token, minting one when none is presented
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    settings: CookieSettings,
}

impl IdentityResolver {
    pub fn new(settings: CookieSettings) -> Self {
        Self { settings }
    }

    /// Resolve the caller's identity
    ///
    /// When a token is minted the returned jar carries the cookie that must
    /// be sent back with the response.
    pub fn resolve(&self, jar: CookieJar) -> (CookieJar, ResolvedIdentity) {
        if let Some(token) = presented_token(&jar) {
            return (
                jar,
                ResolvedIdentity {
                    token,
                    is_new: false,
                },
            );
        }

        let token = SessionToken::generate();
        let jar = jar.add(self.session_cookie(&token));

        (
            jar,
            ResolvedIdentity {
                token,
                is_new: true,
            },
        )
    }

    /// Build the persistent, host-only session cookie for a token
    pub fn session_cookie(&self, token: &SessionToken) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.as_str().to_owned()))
            .path("/")
            .http_only(true)
            .secure(self.settings.secure)
            .same_site(SameSite::Lax)
            .max_age(self.settings.max_age)
            .build()
    }
}

/// The well-formed token presented by the caller, if any
pub fn presented_token(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| SessionToken::parse(cookie.value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_uuid_shaped_and_distinct() {
        let first = SessionToken::generate();
        let second = SessionToken::generate();

        assert_eq!(first.as_str().len(), 36);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
        assert_ne!(first, second);
        assert!(SessionToken::parse(first.as_str()).is_some());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(SessionToken::parse("").is_none());
        assert!(SessionToken::parse("has space").is_none());
        assert!(SessionToken::parse("semi;colon").is_none());
        assert!(SessionToken::parse(&"a".repeat(129)).is_none());
        assert!(SessionToken::parse(&"a".repeat(128)).is_some());
    }

    #[test]
    fn existing_cookie_is_reused() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "returning-client"));

        let (jar, identity) = IdentityResolver::default().resolve(jar);

        assert!(!identity.is_new);
        assert_eq!(identity.token.as_str(), "returning-client");
        assert_eq!(
            jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
            Some("returning-client".to_string())
        );
    }

    #[test]
    fn missing_cookie_mints_persistent_cookie() {
        let (jar, identity) = IdentityResolver::default().resolve(CookieJar::new());

        assert!(identity.is_new);
        let cookie = jar.get(SESSION_COOKIE).expect("cookie should be set");
        assert_eq!(cookie.value(), identity.token.as_str());
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), None);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::days(365)));
    }

    #[test]
    fn malformed_cookie_is_replaced() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not valid!"));

        let (jar, identity) = IdentityResolver::default().resolve(jar);

        assert!(identity.is_new);
        assert_ne!(identity.token.as_str(), "not valid!");
        assert_eq!(
            jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
            Some(identity.token.to_string())
        );
    }

    #[test]
    fn insecure_cookie_only_when_configured() {
        let resolver = IdentityResolver::new(CookieSettings {
            secure: false,
            max_age: Duration::days(7),
        });

        let cookie = resolver.session_cookie(&SessionToken::generate());
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }
}
