//! Signed bearer access tokens.

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    companies::records::CompanyUuid,
    users::records::{Role, UserUuid},
};

/// Access tokens are short-lived; fifteen minutes unless configured otherwise.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Minimum accepted signing-key length in bytes.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

const TOKEN_TYPE_ACCESS: &str = "access";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user uuid.
    pub sub: Uuid,

    /// Company the subject belonged to at issue time.
    pub cid: Uuid,

    /// Role snapshot at issue time. A hint only; authorization re-reads the
    /// current role on every request.
    pub role: Role,

    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub typ: String,
}

impl AccessClaims {
    #[must_use]
    pub fn user_uuid(&self) -> UserUuid {
        UserUuid::from_uuid(self.sub)
    }

    #[must_use]
    pub fn company_uuid(&self) -> CompanyUuid {
        CompanyUuid::from_uuid(self.cid)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("signing key must be at least {MIN_SIGNING_KEY_BYTES} bytes")]
    KeyTooShort,

    #[error("token expired")]
    Expired,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token is not an access token")]
    WrongType,

    #[error("token is malformed")]
    Malformed,
}

/// HS256 codec over a process-wide symmetric key.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl AccessTokenCodec {
    /// # Errors
    ///
    /// Returns `KeyTooShort` when the key has fewer than 32 bytes.
    pub fn new(key: &[u8], ttl_secs: i64) -> Result<Self, AccessTokenError> {
        if key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(AccessTokenError::KeyTooShort);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            ttl_secs,
        })
    }

    /// Sign an access token for the given subject.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if serialization fails, which indicates a bug
    /// rather than bad input.
    pub fn sign(
        &self,
        user: UserUuid,
        company: CompanyUuid,
        role: Role,
        now: Timestamp,
    ) -> Result<String, AccessTokenError> {
        let claims = AccessClaims {
            sub: user.into_uuid(),
            cid: company.into_uuid(),
            role,
            iat: now.as_second(),
            exp: now.as_second() + self.ttl_secs,
            jti: Uuid::now_v7(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_source| AccessTokenError::Malformed)
    }

    /// Verify signature, type, and expiry against the injected clock.
    ///
    /// # Errors
    ///
    /// `Expired`, `BadSignature`, `WrongType`, or `Malformed`.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<AccessClaims, AccessTokenError> {
        // Expiry is checked against the injected clock below, not the
        // system clock inside jsonwebtoken.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|source| match source.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AccessTokenError::BadSignature,
                _ => AccessTokenError::Malformed,
            })?;

        if data.claims.typ != TOKEN_TYPE_ACCESS {
            return Err(AccessTokenError::WrongType);
        }

        if data.claims.exp <= now.as_second() {
            return Err(AccessTokenError::Expired);
        }

        Ok(data.claims)
    }
}
