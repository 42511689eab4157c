//! Database connection management

use sqlx::{PgPool, Postgres, Transaction, query};

use crate::domain::companies::records::CompanyUuid;

/// SQL used to set company context for row-level security.
pub const SET_COMPANY_CONTEXT_SQL: &str =
    "SELECT set_config('app.current_company_uuid', $1, true)";

#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a transaction scoped to one company for RLS policies.
    ///
    /// # Errors
    ///
    /// Returns an error when starting the transaction or setting company context fails.
    pub async fn begin_company_transaction(
        &self,
        company: CompanyUuid,
    ) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        query(SET_COMPANY_CONTEXT_SQL)
            .bind(company.into_uuid().to_string())
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    /// Set the company context on an already-open transaction.
    ///
    /// Used by flows that only learn the tenant mid-transaction, such as a
    /// refresh-token exchange that resolves the user from the token row.
    ///
    /// # Errors
    ///
    /// Returns an error when setting company context fails.
    pub async fn set_company_context(
        tx: &mut Transaction<'static, Postgres>,
        company: CompanyUuid,
    ) -> Result<(), sqlx::Error> {
        query(SET_COMPANY_CONTEXT_SQL)
            .bind(company.into_uuid().to_string())
            .execute(&mut **tx)
            .await
            .map(|_result| ())
    }

    /// Begin a transaction without company context.
    ///
    /// Used by flows that run before a principal exists (login, token
    /// exchange, invite acceptance); every query in such a transaction must
    /// carry its own scoping predicates.
    ///
    /// # Errors
    ///
    /// Returns an error when starting the transaction fails.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}

/// Connect to `PostgreSQL`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails; previously applied versions are
/// left untouched.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
