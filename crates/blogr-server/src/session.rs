//! Session cookie plumbing.
//!
//! Token signing and revocation live in `blogr_auth::session`; this module
//! only decides how the token travels in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use blogr_auth::{SessionSigner, SessionToken};
use time::Duration;

use crate::config::SessionConfig;

/// Everything the request pipeline needs to read and write session cookies.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub signer: SessionSigner,
    pub cookie_name: String,
    pub secure: bool,
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            signer: SessionSigner::new(&config.secret_key, config.max_age_secs),
            cookie_name: config.cookie_name.clone(),
            secure: config.secure_cookie,
        }
    }

    /// Reads and verifies the session token carried by the request, if any.
    pub fn read(&self, jar: &CookieJar, now: i64) -> Option<SessionToken> {
        let cookie = jar.get(&self.cookie_name)?;
        let token = self.signer.verify(cookie.value(), now);
        if token.is_none() {
            tracing::debug!("ignoring invalid or expired session cookie");
        }
        token
    }

    /// Cookie carrying a freshly signed `token`.
    pub fn cookie(&self, token: &SessionToken) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), self.signer.sign(token)))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(self.signer.ttl_secs()))
            .build()
    }

    /// Cookie that, once removed from the jar, clears the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}
