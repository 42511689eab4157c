//! Company records.

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::uuids::TypedUuid;

pub type CompanyUuid = TypedUuid<CompanyRecord>;

/// Policy knobs carried on the company row. Unknown keys are preserved so
/// settings written by newer builds survive a round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySettings {
    /// Allow approvals that take an allocation below zero. Off by default.
    #[serde(default)]
    pub allow_overdraft: bool,

    /// Reserved for a future holiday-aware day count; not consumed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holidays: Vec<Date>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct CompanyRecord {
    pub uuid: CompanyUuid,
    pub name: String,

    /// URL-safe unique identifier.
    pub slug: String,

    pub domain: Option<String>,
    pub settings: CompanySettings,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub uuid: CompanyUuid,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub settings: Option<CompanySettings>,
}
