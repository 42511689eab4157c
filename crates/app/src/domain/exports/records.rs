//! Export projection records.

use jiff::{Timestamp, civil::Date};
use uuid::Uuid;

/// One flat row of the vacation export, ready for tabular serialization.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub request_uuid: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub team_code: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub kind: String,
    pub status: String,
    pub days_count: f64,
    pub approver_email: Option<String>,
    pub approved_at: Option<Timestamp>,
}

/// Forward-only restartable position in an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportCursor {
    pub offset: i64,
}

/// A fetched batch plus the cursor to resume from, if rows remain.
#[derive(Debug, Clone)]
pub struct ExportBatch {
    pub rows: Vec<ExportRow>,
    pub next: Option<ExportCursor>,
}
