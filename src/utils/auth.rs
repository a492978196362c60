use crate::models::user::Claims;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use std::sync::OnceLock;
use uuid::Uuid;

/// Hashes a password with Argon2id and a fresh random salt.
///
/// Returns the PHC string (algorithm, params, salt and hash in one field),
/// which is all `verify_password` needs later.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch. We never want a corrupt row
/// to let somebody in.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A real Argon2 hash of a throwaway password, built once with the same
/// parameters as every stored hash.
///
/// `None` only if hashing itself is broken, in which case registration is
/// failing too and timing is the least of our problems.
pub fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("user-api-timing-equaliser").ok())
        .as_deref()
}

/// Password check used at login. Always pays for one Argon2 verification.
///
/// When the user name doesn't exist (`stored` is `None`) we verify against
/// `dummy_hash()` and throw the answer away, so an unknown user takes as long
/// as a known user with the wrong password.
pub fn check_password(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash);
            }
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization token")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("could not sign token: {0}")]
    Signing(String),
}

/// Issues and verifies the HS256 bearer tokens handed out at login.
///
/// Tokens are stateless: nothing is stored server-side, so a token stays good
/// until `exp` or until the secret is rotated.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        // Zero leeway: "expired" means expired. The default 60s grace would make
        // expiry behaviour fuzzy at the edges.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, id: Uuid, user_name: &str) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + self.ttl).timestamp();
        let claims = Claims {
            id,
            user_name: user_name.to_string(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

/// Pulls the token out of an `Authorization` header value.
///
/// Expected format is `<scheme> <token>`. The scheme keyword is matched
/// case-insensitively, so `JWT`, `jwt` and `Jwt` all work.
pub fn extract_token<'a>(header: &'a str, scheme: &str) -> Result<&'a str, AuthError> {
    let (prefix, token) = header.trim().split_once(' ').ok_or(AuthError::Invalid)?;

    if !prefix.eq_ignore_ascii_case(scheme) {
        return Err(AuthError::Invalid);
    }

    Ok(token.trim())
}
