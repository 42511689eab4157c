//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    clock::{Clock, SystemClock},
    database::{self, Db},
    domain::{
        audit::{AuditService, PgAuditService},
        companies::{CompaniesService, PgCompaniesService},
        exports::{ExportsService, PgExportsService},
        periods::{CalendarService, PgCalendarService},
        requests::{PgRequestsService, RequestsService},
        sessions::{PgSessionsService, SessionsService},
        teams::{OrgService, PgOrgService},
        users::{IdentityService, PgIdentityService},
    },
    mailer::{LogMailer, Mailer},
    password::{HashParams, PasswordHasher},
    rategate::{RateGate, RateTable},
    tokens::{AccessTokenCodec, AccessTokenError},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("invalid signing key")]
    SigningKey(#[source] AccessTokenError),
}

/// Process-wide configuration consumed once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,

    /// Symmetric signing key for access tokens; at least 32 bytes.
    pub signing_key: Vec<u8>,

    pub access_ttl_secs: i64,
    pub hash_params: HashParams,
    pub rate_table: RateTable,
}

#[derive(Clone)]
pub struct AppContext {
    pub companies: Arc<dyn CompaniesService>,
    pub identity: Arc<dyn IdentityService>,
    pub org: Arc<dyn OrgService>,
    pub sessions: Arc<dyn SessionsService>,
    pub calendar: Arc<dyn CalendarService>,
    pub requests: Arc<dyn RequestsService>,
    pub exports: Arc<dyn ExportsService>,
    pub audit: Arc<dyn AuditService>,
    pub rategate: Arc<RateGate>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Build the full service graph against a live database.
    ///
    /// # Errors
    ///
    /// Returns an error when the database connection or signing key is
    /// unusable.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppInitError> {
        let pool = database::connect(&config.database_url)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

        Self::assemble(db, config, clock, mailer)
    }

    /// Wire services over an existing [`Db`], letting callers swap the
    /// clock and mailer. Used by tests with a pinned clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the signing key is unusable.
    pub fn assemble(
        db: Db,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AppInitError> {
        let hasher = Arc::new(PasswordHasher::new(config.hash_params));
        let codec = AccessTokenCodec::new(&config.signing_key, config.access_ttl_secs)
            .map_err(AppInitError::SigningKey)?;
        let rategate = Arc::new(RateGate::new(Arc::clone(&clock), config.rate_table));

        let identity: Arc<dyn IdentityService> =
            Arc::new(PgIdentityService::new(db.clone(), Arc::clone(&hasher)));

        let sessions: Arc<dyn SessionsService> = Arc::new(PgSessionsService::new(
            db.clone(),
            Arc::clone(&identity),
            hasher,
            codec,
            Arc::clone(&rategate),
            Arc::clone(&clock),
            mailer,
        ));

        Ok(Self {
            companies: Arc::new(PgCompaniesService::new(db.clone())),
            identity,
            org: Arc::new(PgOrgService::new(db.clone())),
            sessions,
            calendar: Arc::new(PgCalendarService::new(db.clone())),
            requests: Arc::new(PgRequestsService::new(db.clone(), Arc::clone(&clock))),
            exports: Arc::new(PgExportsService::new(db.clone())),
            audit: Arc::new(PgAuditService::new(db)),
            rategate,
            clock,
        })
    }
}
