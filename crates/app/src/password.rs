//! Argon2id password hashing and the password policy.

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Output length of the raw hash in bytes.
const HASH_LEN: usize = 32;

/// Characters that satisfy the special-character rule.
const SPECIAL_CHARS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Minimum password length accepted by the policy.
const MIN_PASSWORD_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Iterations.
    pub time_cost: u32,

    /// Memory in KiB.
    pub memory_cost: u32,

    /// Lanes.
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            time_cost: 2,
            memory_cost: 64 * 1024,
            parallelism: 4,
        }
    }
}

/// First policy rule a rejected password failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
}

impl PolicyRule {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::TooShort => "password must be at least 12 characters",
            Self::MissingUppercase => "password must contain an uppercase letter",
            Self::MissingLowercase => "password must contain a lowercase letter",
            Self::MissingDigit => "password must contain a digit",
            Self::MissingSpecial => "password must contain a special character",
        }
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password rejected by policy: {}", .0.describe())]
    WeakPassword(PolicyRule),

    #[error("credential mismatch")]
    InvalidCredential,

    #[error("stored password hash is not parseable")]
    StoredHashCorrupt,

    #[error("hashing failed")]
    Hashing(#[source] argon2::password_hash::Error),
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Set when the stored hash uses weaker parameters than current policy;
    /// callers must re-hash and persist on the next successful login.
    pub needs_rehash: bool,
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: HashParams,
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// # Panics
    ///
    /// Panics if the parameters are outside argon2's accepted ranges; the
    /// defaults and any sane configuration are in range, so this is treated
    /// as a startup configuration error.
    #[must_use]
    pub fn new(params: HashParams) -> Self {
        let argon2 = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(
                params.memory_cost,
                params.time_cost,
                params.parallelism,
                Some(HASH_LEN),
            )
            .expect("argon2 params out of range"),
        );

        Self { params, argon2 }
    }

    /// Validate a candidate password against the policy.
    ///
    /// Checked at set/change time only, never at verify time.
    ///
    /// # Errors
    ///
    /// Returns `WeakPassword` carrying the first failing rule.
    pub fn check_policy(password: &str) -> Result<(), PasswordError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PasswordError::WeakPassword(PolicyRule::TooShort));
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordError::WeakPassword(PolicyRule::MissingUppercase));
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordError::WeakPassword(PolicyRule::MissingLowercase));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordError::WeakPassword(PolicyRule::MissingDigit));
        }
        if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            return Err(PasswordError::WeakPassword(PolicyRule::MissingSpecial));
        }

        Ok(())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// CPU-bound for hundreds of milliseconds; callers on an async runtime
    /// must run this inside `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(&password, &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::Hashing)
    }

    /// Verify a password against a stored encoded hash.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` on mismatch, `StoredHashCorrupt` when the stored
    /// encoding cannot be parsed.
    pub fn verify(&self, encoded: &str, password: &str) -> Result<Verified, PasswordError> {
        let parsed =
            PasswordHash::new(encoded).map_err(|_source| PasswordError::StoredHashCorrupt)?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|source| match source {
                argon2::password_hash::Error::Password => PasswordError::InvalidCredential,
                _ => PasswordError::StoredHashCorrupt,
            })?;

        Ok(Verified {
            needs_rehash: self.is_weaker_than_policy(&parsed),
        })
    }

    /// Burn comparable CPU time for lookups that found no user, so a
    /// missing email is not distinguishable from a wrong password by timing.
    pub fn dummy_verify(&self, password: &str) {
        let _unused = self.hash(password);
    }

    fn is_weaker_than_policy(&self, parsed: &PasswordHash<'_>) -> bool {
        let Ok(stored) = Params::try_from(parsed) else {
            return true;
        };

        stored.m_cost() < self.params.memory_cost
            || stored.t_cost() < self.params.time_cost
            || stored.p_cost() < self.params.parallelism
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashParams::default())
    }
}
