// auth/token.rs - Signed, expiring bearer tokens (HS512 JWT)
//
// Access tokens carry the full identity (subject, user id, role authority,
// email). Refresh tokens carry only the subject, user id and a
// `type = "refresh"` marker, and are used solely to mint new token pairs.
// Tokens are stateless: validity is decided by signature and expiration.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::user::User;

const REFRESH_TYPE: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Role authority, access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// "refresh" on refresh tokens, absent on access tokens
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Unique token id
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(user: &User, kind: TokenKind, ttl: Duration) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?
            .timestamp();
        let (role, email, token_type) = match kind {
            TokenKind::Access => (Some(user.role.authority().to_string()), Some(user.email.clone()), None),
            TokenKind::Refresh => (None, None, Some(REFRESH_TYPE.to_string())),
        };

        Ok(Self {
            sub: user.username.clone(),
            user_id: user.id,
            role,
            email,
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp,
        })
    }

    pub fn kind(&self) -> TokenKind {
        match self.token_type.as_deref() {
            Some(REFRESH_TYPE) => TokenKind::Refresh,
            _ => TokenKind::Access,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Why a token was rejected. Messages are matched by the unauthorized
/// responder to refine the hint sent to the client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("JWT claims string is empty")]
    Empty,

    #[error("Malformed JWT token: {0}")]
    Malformed(String),

    #[error("Invalid JWT signature")]
    InvalidSignature,

    #[error("JWT token is expired")]
    Expired,

    #[error("Unsupported JWT token: {0}")]
    UnsupportedAlgorithm(String),

    #[error("JWT token is not a {0} token")]
    WrongKind(&'static str),

    #[error("Invalid JWT token: {0}")]
    Invalid(String),

    #[error("JWT claim '{0}' not present")]
    MissingClaim(String),

    #[error("JWT encoding failed: {0}")]
    Encoding(String),

    #[error("JWT lifetime out of range")]
    LifetimeOutOfRange,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed(err.to_string()),
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
                TokenError::UnsupportedAlgorithm(err.to_string())
            }
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Milliseconds to a `Duration`, saturating instead of wrapping. Issuing
/// with a saturated lifetime fails with `LifetimeOutOfRange`.
fn lifetime(ttl_ms: u64) -> Duration {
    i64::try_from(ttl_ms)
        .ok()
        .and_then(Duration::try_milliseconds)
        .unwrap_or(Duration::MAX)
}

/// Issues and verifies tokens with the process-wide signing key.
/// Built once at startup and shared read-only behind an `Arc`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: lifetime(config.access_token_ttl_ms),
            refresh_ttl: lifetime(config.refresh_token_ttl_ms),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a new token of the given kind for `user`
    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims::new(user, kind, ttl)?;

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiration, returning the classified failure
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Empty);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        // jsonwebtoken compares whole seconds; a token whose expiry second has
        // started is already expired.
        if data.claims.exp.saturating_mul(1000) <= Utc::now().timestamp_millis() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Verify and require a specific token kind
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind() != kind {
            return Err(TokenError::WrongKind(match kind {
                TokenKind::Access => "access",
                TokenKind::Refresh => "refresh",
            }));
        }
        Ok(claims)
    }

    /// Fail-closed validity check. Every failure is logged and yields `false`.
    pub fn validate(&self, token: &str) -> bool {
        match self.verify(token) {
            Ok(_) => true,
            Err(TokenError::Expired) => {
                debug!("JWT token is expired");
                false
            }
            Err(TokenError::Empty) => {
                debug!("JWT claims string is empty");
                false
            }
            Err(e @ TokenError::Malformed(_)) => {
                debug!("Invalid JWT token: {}", e);
                false
            }
            Err(e @ TokenError::InvalidSignature) | Err(e @ TokenError::UnsupportedAlgorithm(_)) => {
                warn!("Rejected JWT token: {}", e);
                false
            }
            Err(e) => {
                warn!("Unexpected JWT validation error: {}", e);
                false
            }
        }
    }

    /// Valid token whose subject is `username`
    pub fn validate_for_subject(&self, token: &str, username: &str) -> bool {
        match self.extract_username(token) {
            Ok(subject) if subject == username => self.validate(token),
            Ok(subject) => {
                warn!("JWT subject '{}' does not match user '{}'", subject, username);
                false
            }
            Err(_) => false,
        }
    }

    /// Decode the claims of a token presumed valid; any failure is a hard
    /// "invalid token" error carrying the cause.
    pub fn extract_claims(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token).map_err(|cause| match cause {
            TokenError::Invalid(_) => cause,
            other => TokenError::Invalid(other.to_string()),
        })
    }

    /// Look up a claim by name. `username` is accepted as an alias of `sub`.
    pub fn extract_claim(&self, token: &str, name: &str) -> Result<Value, TokenError> {
        let claims = self.extract_claims(token)?;
        let key = match name {
            "username" | "subject" => "sub",
            "tokenId" | "id" => "jti",
            other => other,
        };

        let value = serde_json::to_value(&claims).map_err(|e| TokenError::Invalid(e.to_string()))?;
        value
            .get(key)
            .cloned()
            .ok_or_else(|| TokenError::MissingClaim(name.to_string()))
    }

    pub fn extract_username(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.extract_claims(token)?.sub)
    }

    pub fn extract_user_id(&self, token: &str) -> Result<i64, TokenError> {
        Ok(self.extract_claims(token)?.user_id)
    }

    pub fn extract_role(&self, token: &str) -> Result<String, TokenError> {
        self.extract_claims(token)?
            .role
            .ok_or_else(|| TokenError::MissingClaim("role".to_string()))
    }

    pub fn extract_token_id(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.extract_claims(token)?.jti)
    }

    pub fn extract_expiration(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        self.extract_claims(token)?
            .expires_at()
            .ok_or_else(|| TokenError::Invalid("expiration out of range".to_string()))
    }
}
