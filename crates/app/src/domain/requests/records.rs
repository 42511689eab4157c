//! Vacation request records.

use std::str::FromStr;

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        companies::records::CompanyUuid, periods::records::PeriodUuid, teams::records::TeamUuid,
        users::records::UserUuid,
    },
    uuids::TypedUuid,
};

pub type RequestUuid = TypedUuid<VacationRequestRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationKind {
    Annual,
    Sick,
    Personal,
    Unpaid,
    Other,
}

impl VacationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Sick => "sick",
            Self::Personal => "personal",
            Self::Unpaid => "unpaid",
            Self::Other => "other",
        }
    }
}

impl FromStr for VacationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "annual" => Ok(Self::Annual),
            "sick" => Ok(Self::Sick),
            "personal" => Ok(Self::Personal),
            "unpaid" => Ok(Self::Unpaid),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown vacation kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Withdrawn,
}

impl RequestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Terminal states admit no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled | Self::Withdrawn)
    }

    /// States that occupy calendar days for overlap purposes. Drafts do
    /// not; terminal non-approved states do not.
    #[must_use]
    pub const fn blocks_overlap(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VacationRequestRecord {
    pub uuid: RequestUuid,
    pub company_uuid: CompanyUuid,
    pub user_uuid: UserUuid,
    pub team_uuid: Option<TeamUuid>,

    /// Resolved at submission from the start date.
    pub period_uuid: Option<PeriodUuid>,

    pub start_date: Date,
    pub end_date: Date,
    pub kind: VacationKind,
    pub status: RequestStatus,
    pub reason: Option<String>,
    pub approver_uuid: Option<UserUuid>,
    pub approved_at: Option<Timestamp>,
    pub rejected_reason: Option<String>,

    /// Business days in the inclusive range, computed at submission.
    pub days_count: f64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Payload for creating or modifying a request.
#[derive(Debug, Clone)]
pub struct RequestPayload {
    pub start_date: Date,
    pub end_date: Date,
    pub kind: VacationKind,
    pub reason: Option<String>,
    pub team_uuid: Option<TeamUuid>,
}

/// List filter; unset fields match everything within scope.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub user_uuid: Option<UserUuid>,
    pub team_uuid: Option<TeamUuid>,

    /// Keep requests ending on or after this date.
    pub from: Option<Date>,

    /// Keep requests starting on or before this date.
    pub to: Option<Date>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_taxonomy() {
        use RequestStatus::*;

        for status in [Approved, Rejected, Cancelled, Withdrawn] {
            assert!(status.is_terminal(), "{status:?}");
        }
        for status in [Draft, Pending] {
            assert!(!status.is_terminal(), "{status:?}");
        }

        // Only submitted, live requests occupy calendar days.
        for status in [Pending, Approved] {
            assert!(status.blocks_overlap(), "{status:?}");
        }
        for status in [Draft, Rejected, Cancelled, Withdrawn] {
            assert!(!status.blocks_overlap(), "{status:?}");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        use std::str::FromStr;

        for status in [
            RequestStatus::Draft,
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Cancelled,
            RequestStatus::Withdrawn,
        ] {
            assert_eq!(RequestStatus::from_str(status.as_str()), Ok(status));
        }

        assert!(RequestStatus::from_str("unknown").is_err());
    }
}
