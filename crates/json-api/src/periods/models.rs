//! Vacation period shapes.

use furlough_app::domain::periods::records::{VacationAllocationRecord, VacationPeriodRecord};
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PeriodResponse {
    pub uuid: Uuid,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub is_default: bool,
    pub is_active: bool,
}

impl From<VacationPeriodRecord> for PeriodResponse {
    fn from(period: VacationPeriodRecord) -> Self {
        Self {
            uuid: period.uuid.into_uuid(),
            name: period.name,
            start_date: period.start_date.to_string(),
            end_date: period.end_date.to_string(),
            is_default: period.is_default,
            is_active: period.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AllocationResponse {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub period_uuid: Uuid,
    pub total_days: f64,
    pub carried_over_days: f64,
    pub days_used: f64,
    pub notes: Option<String>,
}

impl From<VacationAllocationRecord> for AllocationResponse {
    fn from(allocation: VacationAllocationRecord) -> Self {
        Self {
            uuid: allocation.uuid.into_uuid(),
            user_uuid: allocation.user_uuid.into_uuid(),
            period_uuid: allocation.period_uuid.into_uuid(),
            total_days: allocation.total_days,
            carried_over_days: allocation.carried_over_days,
            days_used: allocation.days_used,
            notes: allocation.notes,
        }
    }
}
