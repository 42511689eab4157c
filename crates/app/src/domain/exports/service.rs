//! Exports service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::Error;
use thiserror::Error as ThisError;

use crate::{
    authz::{self, Action, AuthzDenied, Operation, Principal, Resource},
    database::Db,
    domain::{
        exports::{
            records::{ExportBatch, ExportCursor},
            repository::PgExportsRepository,
        },
        requests::records::RequestFilter,
    },
};

/// Rows fetched per batch. Batches are restartable by cursor, so callers
/// stream arbitrarily large exports without holding them in memory.
pub const EXPORT_BATCH_SIZE: i64 = 1000;

#[derive(Debug, ThisError)]
pub enum ExportsServiceError {
    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ExportsServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}

impl From<AuthzDenied> for ExportsServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}

#[derive(Clone)]
pub struct PgExportsService {
    db: Db,
    repository: PgExportsRepository,
}

impl PgExportsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgExportsRepository::new(),
        }
    }
}

#[async_trait]
impl ExportsService for PgExportsService {
    async fn fetch_batch(
        &self,
        principal: &Principal,
        filter: RequestFilter,
        cursor: ExportCursor,
    ) -> Result<ExportBatch, ExportsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let rows = self
            .repository
            .fetch_rows(
                &mut tx,
                scope.company,
                &scope.user_predicate_binds(),
                &filter,
                EXPORT_BATCH_SIZE,
                cursor.offset.max(0),
            )
            .await?;

        tx.commit().await?;

        let next = (rows.len() as i64 == EXPORT_BATCH_SIZE).then(|| ExportCursor {
            offset: cursor.offset + EXPORT_BATCH_SIZE,
        });

        Ok(ExportBatch { rows, next })
    }
}

#[automock]
#[async_trait]
pub trait ExportsService: Send + Sync {
    /// One forward-only batch of the export, intersected with the
    /// principal's scope. Pass the returned cursor to resume.
    async fn fetch_batch(
        &self,
        principal: &Principal,
        filter: RequestFilter,
        cursor: ExportCursor,
    ) -> Result<ExportBatch, ExportsServiceError>;
}
