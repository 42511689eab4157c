//! Org response shapes.

use furlough_app::domain::{
    companies::records::CompanyRecord,
    teams::records::{FunctionRecord, TeamRecord},
    teams::service::TeamDetail,
};
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CompanyResponse {
    pub uuid: Uuid,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub created_at: String,
}

impl From<CompanyRecord> for CompanyResponse {
    fn from(company: CompanyRecord) -> Self {
        Self {
            uuid: company.uuid.into_uuid(),
            name: company.name,
            slug: company.slug,
            domain: company.domain,
            created_at: company.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct FunctionResponse {
    pub uuid: Uuid,
    pub name: String,
    pub code: String,
}

impl From<FunctionRecord> for FunctionResponse {
    fn from(function: FunctionRecord) -> Self {
        Self {
            uuid: function.uuid.into_uuid(),
            name: function.name,
            code: function.code,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TeamResponse {
    pub uuid: Uuid,
    pub function_uuid: Uuid,
    pub name: String,
    pub code: String,
}

impl From<TeamRecord> for TeamResponse {
    fn from(team: TeamRecord) -> Self {
        Self {
            uuid: team.uuid.into_uuid(),
            function_uuid: team.function_uuid.into_uuid(),
            name: team.name,
            code: team.code,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TeamDetailResponse {
    pub team: TeamResponse,
    pub member_uuids: Vec<Uuid>,
    pub manager_uuids: Vec<Uuid>,
}

impl From<TeamDetail> for TeamDetailResponse {
    fn from(detail: TeamDetail) -> Self {
        Self {
            team: detail.team.into(),
            member_uuids: detail
                .members
                .into_iter()
                .map(|membership| membership.user_uuid.into_uuid())
                .collect(),
            manager_uuids: detail
                .managers
                .into_iter()
                .map(|assignment| assignment.manager_uuid.into_uuid())
                .collect(),
        }
    }
}
