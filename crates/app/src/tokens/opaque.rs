//! Opaque token generation, formatting, parsing, and digesting.
//!
//! Refresh, invite, and password-reset tokens are random bearer secrets.
//! Only a SHA-256 digest of the full token string is ever persisted; the
//! raw value exists in the issuing response and nowhere else.

use std::{fmt, str::FromStr};

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

/// Number of secret bytes encoded in a token.
pub const OPAQUE_SECRET_BYTES: usize = 32;

const OPAQUE_SECRET_HEX_CHARS: usize = OPAQUE_SECRET_BYTES * 2;

/// Token family, carried as the format prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFamily {
    Refresh,
    Invite,
    PasswordReset,
}

impl TokenFamily {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Refresh => "fr",
            Self::Invite => "fi",
            Self::PasswordReset => "fp",
        }
    }
}

impl FromStr for TokenFamily {
    type Err = OpaqueTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fr" => Ok(Self::Refresh),
            "fi" => Ok(Self::Invite),
            "fp" => Ok(Self::PasswordReset),
            _ => Err(OpaqueTokenError::UnknownFamily),
        }
    }
}

#[derive(Clone)]
pub struct OpaqueSecret {
    bytes: [u8; OPAQUE_SECRET_BYTES],
}

impl OpaqueSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OPAQUE_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OPAQUE_SECRET_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for OpaqueSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaqueSecret(**redacted**)")
    }
}

impl Drop for OpaqueSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpaqueTokenError {
    #[error("token format is invalid")]
    InvalidFormat,

    #[error("token family is unknown")]
    UnknownFamily,

    #[error("token secret encoding is invalid")]
    InvalidSecretEncoding,
}

/// A freshly issued token: the raw string to hand to the caller once, the
/// record id embedded in it, and the digest to persist.
#[derive(Debug, Clone)]
pub struct IssuedOpaqueToken {
    pub token: String,
    pub token_uuid: Uuid,
    pub token_hash: String,
}

#[derive(Debug)]
pub struct ParsedOpaqueToken {
    pub family: TokenFamily,
    pub token_uuid: Uuid,
    token_hash: String,
}

impl ParsedOpaqueToken {
    /// Digest of the full presented token, for lookup by hash.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }
}

/// Mint a token of the given family with 256 bits of fresh entropy.
#[must_use]
pub fn issue_opaque_token(family: TokenFamily) -> IssuedOpaqueToken {
    let token_uuid = Uuid::now_v7();

    let mut secret_bytes = [0_u8; OPAQUE_SECRET_BYTES];
    OsRng.fill_bytes(&mut secret_bytes);
    let secret = OpaqueSecret::from_bytes(secret_bytes);

    let token = format_opaque_token(family, token_uuid, &secret);
    let token_hash = digest_token(&token);

    IssuedOpaqueToken {
        token,
        token_uuid,
        token_hash,
    }
}

/// Parse a presented token and compute its lookup digest.
///
/// # Errors
///
/// Returns an error when the format, family, or secret encoding is invalid.
pub fn parse_opaque_token(token: &str) -> Result<ParsedOpaqueToken, OpaqueTokenError> {
    let (prefix_and_id, secret_hex) = token
        .split_once('.')
        .ok_or(OpaqueTokenError::InvalidFormat)?;

    let (prefix, token_uuid_segment) = prefix_and_id
        .split_once('_')
        .ok_or(OpaqueTokenError::InvalidFormat)?;

    let family = TokenFamily::from_str(prefix)?;

    let token_uuid =
        Uuid::try_parse(token_uuid_segment).map_err(|_| OpaqueTokenError::InvalidFormat)?;

    if secret_hex.len() != OPAQUE_SECRET_HEX_CHARS
        || !secret_hex.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(OpaqueTokenError::InvalidSecretEncoding);
    }

    Ok(ParsedOpaqueToken {
        family,
        token_uuid,
        token_hash: digest_token(token),
    })
}

fn format_opaque_token(family: TokenFamily, token_uuid: Uuid, secret: &OpaqueSecret) -> String {
    format!(
        "{}_{}.{}",
        family.prefix(),
        token_uuid.simple(),
        encode_secret_hex(secret.as_bytes())
    )
}

fn digest_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn encode_secret_hex(secret: &[u8; OPAQUE_SECRET_BYTES]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(OPAQUE_SECRET_HEX_CHARS);

    for byte in secret {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_parse_round_trips() {
        let issued = issue_opaque_token(TokenFamily::Refresh);
        let parsed = parse_opaque_token(&issued.token).expect("token should parse");

        assert_eq!(parsed.family, TokenFamily::Refresh);
        assert_eq!(parsed.token_uuid, issued.token_uuid);
        assert_eq!(parsed.token_hash(), issued.token_hash);
    }

    #[test]
    fn families_have_distinct_prefixes() {
        let refresh = issue_opaque_token(TokenFamily::Refresh);
        let invite = issue_opaque_token(TokenFamily::Invite);
        let reset = issue_opaque_token(TokenFamily::PasswordReset);

        assert!(refresh.token.starts_with("fr_"));
        assert!(invite.token.starts_with("fi_"));
        assert!(reset.token.starts_with("fp_"));
    }

    #[test]
    fn digest_is_not_the_raw_token() {
        let issued = issue_opaque_token(TokenFamily::Invite);

        assert_ne!(issued.token, issued.token_hash);
        assert_eq!(issued.token_hash.len(), 64);
    }

    #[test]
    fn parse_rejects_unknown_prefix() {
        let issued = issue_opaque_token(TokenFamily::Refresh);
        let forged = issued.token.replacen("fr_", "xx_", 1);

        assert_eq!(
            parse_opaque_token(&forged).unwrap_err(),
            OpaqueTokenError::UnknownFamily,
        );
    }

    #[test]
    fn parse_rejects_short_secret() {
        let token_uuid = Uuid::nil();

        assert_eq!(
            parse_opaque_token(&format!("fr_{}.abcd", token_uuid.simple())).unwrap_err(),
            OpaqueTokenError::InvalidSecretEncoding,
        );
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert_eq!(
            parse_opaque_token("fr-no-dot-here").unwrap_err(),
            OpaqueTokenError::InvalidFormat,
        );
    }

    #[test]
    fn tampered_secret_changes_the_digest() {
        let issued = issue_opaque_token(TokenFamily::Refresh);

        let mut tampered = issued.token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        let parsed = parse_opaque_token(&tampered).expect("format is still valid");

        assert_ne!(parsed.token_hash(), issued.token_hash);
    }
}
