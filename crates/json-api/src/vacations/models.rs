//! Vacation request shapes.

use std::str::FromStr;

use furlough_app::domain::{
    periods::records::BalanceEntry,
    requests::records::{RequestPayload, VacationKind, VacationRequestRecord},
    teams::records::TeamUuid,
};
use jiff::civil::Date;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct VacationRequestBody {
    /// ISO date, e.g. `2025-07-14`.
    pub start_date: String,
    pub end_date: String,

    /// One of annual, sick, personal, unpaid, other.
    pub kind: String,

    pub reason: Option<String>,
    pub team_uuid: Option<Uuid>,

    /// Submit directly instead of keeping a draft.
    #[serde(default = "default_submit")]
    pub submit: bool,
}

fn default_submit() -> bool {
    true
}

impl VacationRequestBody {
    pub(crate) fn into_payload(self) -> Result<(RequestPayload, bool), ApiError> {
        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;

        let kind = VacationKind::from_str(&self.kind)
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown vacation kind"))?;

        Ok((
            RequestPayload {
                start_date,
                end_date,
                kind,
                reason: self.reason,
                team_uuid: self.team_uuid.map(TeamUuid::from_uuid),
            },
            self.submit,
        ))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<Date, ApiError> {
    Date::from_str(raw)
        .map_err(|_error| ApiError::bad_request("invalid_input", "Dates must be ISO yyyy-mm-dd"))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct VacationRequestResponse {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub team_uuid: Option<Uuid>,
    pub period_uuid: Option<Uuid>,
    pub start_date: String,
    pub end_date: String,
    pub kind: String,
    pub status: String,
    pub reason: Option<String>,
    pub approver_uuid: Option<Uuid>,
    pub approved_at: Option<String>,
    pub rejected_reason: Option<String>,
    pub days_count: f64,
    pub created_at: String,
}

impl From<VacationRequestRecord> for VacationRequestResponse {
    fn from(request: VacationRequestRecord) -> Self {
        Self {
            uuid: request.uuid.into_uuid(),
            user_uuid: request.user_uuid.into_uuid(),
            team_uuid: request.team_uuid.map(Into::into),
            period_uuid: request.period_uuid.map(Into::into),
            start_date: request.start_date.to_string(),
            end_date: request.end_date.to_string(),
            kind: request.kind.as_str().to_string(),
            status: request.status.as_str().to_string(),
            reason: request.reason,
            approver_uuid: request.approver_uuid.map(Into::into),
            approved_at: request.approved_at.map(|at| at.to_string()),
            rejected_reason: request.rejected_reason,
            days_count: request.days_count,
            created_at: request.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct BalanceResponse {
    pub period_uuid: Uuid,
    pub period_name: String,
    pub period_start: String,
    pub period_end: String,
    pub total_days: f64,
    pub carried_over_days: f64,
    pub days_used: f64,
    pub remaining: f64,
    pub pending_days: f64,
}

impl From<BalanceEntry> for BalanceResponse {
    fn from(entry: BalanceEntry) -> Self {
        let remaining = entry.remaining();

        Self {
            period_uuid: entry.period.uuid.into_uuid(),
            period_name: entry.period.name,
            period_start: entry.period.start_date.to_string(),
            period_end: entry.period.end_date.to_string(),
            total_days: entry.allocation.total_days,
            carried_over_days: entry.allocation.carried_over_days,
            days_used: entry.allocation.days_used,
            remaining,
            pending_days: entry.pending_days,
        }
    }
}
