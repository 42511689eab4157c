//! Companies service.

use async_trait::async_trait;
use mockall::automock;
use serde_json::json;

use crate::{
    authz::{self, Action, Operation, Principal, Resource},
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        companies::{
            errors::CompaniesServiceError,
            records::{CompanyPatch, CompanyRecord, CompanyUuid, NewCompany},
            repository::PgCompaniesRepository,
        },
    },
};

#[derive(Clone)]
pub struct PgCompaniesService {
    db: Db,
    repository: PgCompaniesRepository,
    audit: PgAuditRepository,
}

impl PgCompaniesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCompaniesRepository::new(),
            audit: PgAuditRepository::new(),
        }
    }

    /// Unauthenticated creation path for bootstrap tooling (CLI seeding).
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the slug is taken.
    pub async fn create_company(
        &self,
        company: NewCompany,
    ) -> Result<CompanyRecord, CompaniesServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_company(&mut tx, &company).await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[async_trait]
impl CompaniesService for PgCompaniesService {
    async fn get_company(
        &self,
        principal: &Principal,
        company: CompanyUuid,
    ) -> Result<CompanyRecord, CompaniesServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Company, Action::Read))?;

        // The only readable company is the principal's own.
        authz::ensure_same_company(principal, company)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let record = self
            .repository
            .find_by_uuid(&mut tx, company)
            .await?
            .ok_or(CompaniesServiceError::NotFound)?;

        tx.commit().await?;

        Ok(record)
    }

    async fn update_company(
        &self,
        principal: &Principal,
        company: CompanyUuid,
        patch: CompanyPatch,
    ) -> Result<CompanyRecord, CompaniesServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Company, Action::Update))?;
        authz::ensure_same_company(principal, company)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let before = self
            .repository
            .find_by_uuid(&mut tx, company)
            .await?
            .ok_or(CompaniesServiceError::NotFound)?;

        let after = self
            .repository
            .update_company(&mut tx, company, &patch)
            .await?
            .ok_or(CompaniesServiceError::NotFound)?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::CompanyUpdated,
                    "company",
                    Some(company.into_uuid()),
                )
                .with_before(json!({ "name": before.name, "domain": before.domain }))
                .with_after(json!({ "name": after.name, "domain": after.domain })),
            )
            .await?;

        tx.commit().await?;

        Ok(after)
    }
}

#[automock]
#[async_trait]
pub trait CompaniesService: Send + Sync {
    /// Read the principal's own company; any other uuid is a cross-tenant
    /// denial.
    async fn get_company(
        &self,
        principal: &Principal,
        company: CompanyUuid,
    ) -> Result<CompanyRecord, CompaniesServiceError>;

    /// Admin-only update of name, domain, and settings.
    async fn update_company(
        &self,
        principal: &Principal,
        company: CompanyUuid,
        patch: CompanyPatch,
    ) -> Result<CompanyRecord, CompaniesServiceError>;
}
