//! Get Company Handler

use std::sync::Arc;

use furlough_app::domain::companies::records::CompanyUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    org::{errors::company_into_api_error, models::CompanyResponse},
    state::State,
};

/// Get Company Handler
///
/// Only the caller's own company resolves; any other id is a cross-tenant
/// probe and answers not-found.
#[endpoint(
    tags("org"),
    summary = "Fetch the caller's company",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Company"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or foreign company"),
    ),
)]
pub(crate) async fn handler(
    company: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CompanyResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .companies
        .get_company(&principal, CompanyUuid::from_uuid(company.into_inner()))
        .await
        .map_err(company_into_api_error)?;

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::companies::{CompaniesServiceError, MockCompaniesService};
    use salvo::test::TestClient;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test_helpers::companies_service;

    use super::*;

    #[tokio::test]
    async fn test_foreign_company_returns_404_not_403() -> TestResult {
        let mut companies = MockCompaniesService::new();

        companies
            .expect_get_company()
            .once()
            .return_once(|_, _| Err(CompaniesServiceError::CrossTenantAccess));

        let service =
            companies_service(companies, Router::with_path("companies/{company}").get(handler));

        let res = TestClient::get(format!("http://example.com/companies/{}", Uuid::nil()))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
