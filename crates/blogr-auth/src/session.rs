//! Signed session tokens and identity resolution.
//!
//! A session token is what the browser carries in the session cookie:
//!
//! ```text
//! base64url(sid|user_id|expires_unix_secs|hmac_sha256_hex)
//! ```
//!
//! The HMAC binds the user id to a random session id and an expiry, so a
//! client cannot forge or extend a session. Signature alone cannot express
//! logout, though: a copy of the cookie would stay valid until it expires.
//! Each issued `sid` is therefore also recorded in `user_session`, and logout
//! deletes that row. A token is accepted only if it verifies *and* its row is
//! still present.

use base64::Engine;
use blogr_types::User;
use hmac::{Hmac, Mac};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::{users, AuthError};

type HmacSha256 = Hmac<Sha256>;

/// The verified contents of a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Random session id, primary key of `user_session`.
    pub sid: String,
    /// The logged-in user.
    pub user_id: i64,
    /// Unix seconds after which the token is rejected.
    pub expires_at: i64,
}

/// Signs and verifies session tokens with a key derived from the app secret.
#[derive(Clone)]
pub struct SessionSigner {
    key: [u8; 32],
    ttl_secs: i64,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Derives the HMAC key from `secret_key` with a domain-separation
    /// prefix, so the raw secret is never used as a MAC key directly.
    pub fn new(secret_key: &str, ttl_secs: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"blogr-session-v1:");
        hasher.update(secret_key.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());

        Self {
            key,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Lifetime of newly issued tokens, in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key length is valid");
        mac.update(payload.as_bytes());
        mac
    }

    /// Encodes and signs `token` for the cookie value.
    pub fn sign(&self, token: &SessionToken) -> String {
        let payload = format!("{}|{}|{}", token.sid, token.user_id, token.expires_at);
        let signature = self.mac(&payload).finalize().into_bytes();
        let raw = format!("{}|{}", payload, hex::encode(signature));
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decodes a cookie value, checking the signature and the expiry.
    ///
    /// Returns `None` for anything malformed, forged or expired; the caller
    /// treats all of those as "no session".
    pub fn verify(&self, value: &str, now: i64) -> Option<SessionToken> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(value.as_bytes())
            .ok()?;
        let raw = String::from_utf8(decoded).ok()?;

        let (payload, sig_hex) = raw.rsplit_once('|')?;
        let signature = hex::decode(sig_hex).ok()?;
        // verify_slice compares in constant time.
        self.mac(payload).verify_slice(&signature).ok()?;

        let mut parts = payload.splitn(3, '|');
        let sid = parts.next()?;
        let user_id = parts.next()?.parse().ok()?;
        let expires_at: i64 = parts.next()?.parse().ok()?;

        if sid.is_empty() || now >= expires_at {
            return None;
        }

        Some(SessionToken {
            sid: sid.to_string(),
            user_id,
            expires_at,
        })
    }
}

/// Starts a new session for `user_id` and records it as live.
pub fn create_session(
    conn: &Connection,
    signer: &SessionSigner,
    user_id: i64,
    now: i64,
) -> Result<SessionToken, AuthError> {
    let token = SessionToken {
        sid: uuid::Uuid::new_v4().simple().to_string(),
        user_id,
        expires_at: now.saturating_add(signer.ttl_secs()),
    };

    conn.execute(
        "INSERT INTO user_session (sid, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token.sid, token.user_id, now, token.expires_at],
    )?;

    tracing::debug!(user_id, "session created");
    Ok(token)
}

/// Ends a session. Returns `false` if it was already gone.
pub fn revoke_session(conn: &Connection, sid: &str) -> Result<bool, AuthError> {
    let removed = conn.execute("DELETE FROM user_session WHERE sid = ?1", [sid])?;
    Ok(removed > 0)
}

/// Whether `token` still has a live, unexpired `user_session` row for the
/// same user.
pub fn session_is_live(
    conn: &Connection,
    token: &SessionToken,
    now: i64,
) -> Result<bool, AuthError> {
    let live = conn
        .query_row(
            "SELECT 1 FROM user_session WHERE sid = ?1 AND user_id = ?2 AND expires_at > ?3",
            params![token.sid, token.user_id, now],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(live)
}

/// Deletes expired session rows. Returns how many were removed.
pub fn purge_expired_sessions(conn: &Connection, now: i64) -> Result<usize, AuthError> {
    let purged = conn.execute("DELETE FROM user_session WHERE expires_at <= ?1", [now])?;
    if purged > 0 {
        tracing::debug!(purged, "purged expired sessions");
    }
    Ok(purged)
}

/// Resolves the user for the current request.
///
/// `None` when there is no token, the session was revoked or expired, or the
/// user id no longer points at a row.
pub fn resolve_identity(
    conn: &Connection,
    token: Option<&SessionToken>,
    now: i64,
) -> Result<Option<User>, AuthError> {
    let Some(token) = token else {
        return Ok(None);
    };

    if !session_is_live(conn, token, now)? {
        return Ok(None);
    }

    users::get_user(conn, token.user_id)
}
