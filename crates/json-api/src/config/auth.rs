//! Auth Config

use clap::Args;
use furlough_app::password::HashParams;

/// Token signing and password-hashing settings.
#[derive(Debug, Args)]
pub struct AuthConfig {
    /// Symmetric signing key for access tokens; at least 32 bytes
    #[arg(long, env = "SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TTL_SECS", default_value = "900")]
    pub access_ttl_secs: i64,

    /// Argon2 iterations
    #[arg(long, env = "ARGON2_TIME_COST", default_value = "2")]
    pub argon2_time_cost: u32,

    /// Argon2 memory in KiB
    #[arg(long, env = "ARGON2_MEMORY_COST", default_value = "65536")]
    pub argon2_memory_cost: u32,

    /// Argon2 lanes
    #[arg(long, env = "ARGON2_PARALLELISM", default_value = "4")]
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn hash_params(&self) -> HashParams {
        HashParams {
            time_cost: self.argon2_time_cost,
            memory_cost: self.argon2_memory_cost,
            parallelism: self.argon2_parallelism,
        }
    }
}
