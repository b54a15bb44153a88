use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum_extra::extract::cookie::{Cookie, SameSite};
use bson::{DateTime, Uuid};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::user::User;

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

/// Hashes a raw password with Argon2 and a fresh salt.
pub fn hash_password(raw: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    ARGON2
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| ApiError::Internal(format!("Hashing the password failed: {error}")))
}

/// Checks a raw password against a stored Argon2 hash.
pub fn verify_password(raw: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|error| ApiError::Internal(format!("Stored password hash is malformed: {error}")))?;
    Ok(ARGON2.verify_password(raw.as_bytes(), &parsed).is_ok())
}

/// Decides a login attempt.
///
/// A missing user and a wrong password yield the identical error, so the
/// outcome does not reveal which emails are registered.
pub fn check_login<'a>(user: Option<&'a User>, password: &str) -> Result<&'a User, ApiError> {
    let user = user.ok_or_else(|| ApiError::Auth("Invalid email or password".to_string()))?;
    if !verify_password(password, &user.password_hash)? {
        return Err(ApiError::Auth("Invalid email or password".to_string()));
    }
    Ok(user)
}

/// Checks a presented reset token digest against the one stored on a user.
///
/// Rejects when no token is outstanding, the digests differ, or the expiry
/// is not in the future. A successful reset clears both stored fields, so a
/// replayed token falls into the first case.
pub fn reset_token_matches(user: &User, digest: &str, now: DateTime) -> bool {
    match (&user.reset_password_token_hash, user.reset_password_expires) {
        (Some(stored), Some(expires)) => stored == digest && expires > now,
        _ => false,
    }
}

/// Claims carried by a signed session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// UUID of the user the session belongs to.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Capability for issuing and verifying session tokens.
///
/// Held in the service state and passed explicitly wherever a session is
/// created or checked; there is no ambient session state.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a fresh signed session token for a user.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, ApiError> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|error| ApiError::Internal(format!("Issuing the session token failed: {error}")))
    }

    /// Verifies a presented session token and returns the user UUID it names.
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| ApiError::Auth("Session token is invalid or has expired".to_string()))?;
        let parsed = uuid::Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Auth("Session token is invalid or has expired".to_string()))?;
        Ok(Uuid::from_uuid_1(parsed))
    }
}

/// Builds the HTTP-only cookie carrying a session token.
pub fn session_cookie(token: String, ttl_days: i64) -> Cookie<'static> {
    Cookie::build(("token", token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(ttl_days))
        .build()
}

/// A freshly generated password reset token.
///
/// The raw form is delivered to the user out-of-band; only the digest is
/// persisted, so a leaked user record cannot be replayed as a token.
pub struct ResetToken {
    pub raw: String,
    pub digest: String,
}

/// Generates a single-use password reset token.
pub fn generate_reset_token() -> ResetToken {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let digest = hash_reset_token(&raw);
    ResetToken { raw, digest }
}

/// SHA-256 digest of a raw reset token, as stored on the user record.
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{Avatar, Role};

    fn sample_user(password_hash: String) -> User {
        User {
            _id: Uuid::new(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash,
            role: Role::Standard,
            avatar: Avatar::placeholder(),
            reset_password_token_hash: None,
            reset_password_expires: None,
        }
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn password_hashes_are_salted() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn issued_session_tokens_verify_to_the_same_user() {
        let keys = SessionKeys::new("test-secret");
        let user_id = Uuid::new();
        let token = keys.issue(user_id, Duration::days(1)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn garbage_session_tokens_are_rejected() {
        let keys = SessionKeys::new("test-secret");
        assert!(keys.verify("not-a-token").is_err());
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let keys = SessionKeys::new("test-secret");
        let other = SessionKeys::new("other-secret");
        let token = other.issue(Uuid::new(), Duration::days(1)).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn expired_session_tokens_are_rejected() {
        let keys = SessionKeys::new("test-secret");
        let token = keys.issue(Uuid::new(), Duration::hours(-1)).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn reset_tokens_are_unique_and_digest_deterministically() {
        let first = generate_reset_token();
        let second = generate_reset_token();
        assert_ne!(first.raw, second.raw);
        assert_eq!(first.digest, hash_reset_token(&first.raw));
        assert_ne!(first.digest, first.raw);
    }

    #[test]
    fn login_hides_whether_the_email_exists() {
        let user = sample_user(hash_password("right password").unwrap());
        let missing_user = check_login(None, "right password").unwrap_err();
        let wrong_password = check_login(Some(&user), "wrong password").unwrap_err();
        assert_eq!(missing_user.to_string(), wrong_password.to_string());
        assert_eq!(missing_user.status_code(), wrong_password.status_code());
    }

    #[test]
    fn login_accepts_the_correct_password() {
        let user = sample_user(hash_password("right password").unwrap());
        let checked = check_login(Some(&user), "right password").unwrap();
        assert_eq!(checked._id, user._id);
    }

    #[test]
    fn outstanding_reset_tokens_match_before_expiry() {
        let token = generate_reset_token();
        let mut user = sample_user("irrelevant".to_string());
        user.reset_password_token_hash = Some(token.digest.clone());
        user.reset_password_expires =
            Some(DateTime::from_chrono(Utc::now() + Duration::minutes(15)));
        assert!(reset_token_matches(&user, &hash_reset_token(&token.raw), DateTime::now()));
        assert!(!reset_token_matches(&user, &hash_reset_token("other token"), DateTime::now()));
    }

    #[test]
    fn cleared_reset_tokens_are_rejected() {
        let token = generate_reset_token();
        let user = sample_user("irrelevant".to_string());
        // Both fields are unset after a successful reset, so a replay of the
        // same raw token no longer matches anything.
        assert!(!reset_token_matches(&user, &token.digest, DateTime::now()));
    }

    #[test]
    fn expired_reset_tokens_are_rejected() {
        let token = generate_reset_token();
        let mut user = sample_user("irrelevant".to_string());
        user.reset_password_token_hash = Some(token.digest.clone());
        user.reset_password_expires =
            Some(DateTime::from_chrono(Utc::now() - Duration::minutes(1)));
        assert!(!reset_token_matches(&user, &token.digest, DateTime::now()));
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("token-value".to_string(), 5);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
