//! Vacation Export Handler

use std::{str::FromStr, sync::Arc};

use furlough_app::domain::{
    exports::{ExportsServiceError, records::ExportCursor, records::ExportRow},
    requests::records::{RequestFilter, RequestStatus},
    teams::records::TeamUuid,
    users::records::UserUuid,
};
use salvo::prelude::*;
use tracing::error;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::models::parse_date,
};

const CSV_HEADER: &str =
    "request_uuid,email,first_name,last_name,team,start_date,end_date,kind,status,days_count,approver_email,approved_at";

/// Vacation Export Handler
///
/// Streams the caller's scope as CSV. Workbook formats are outside this
/// service; `format=xlsx` is answered with a validation error naming CSV.
#[endpoint(
    tags("exports"),
    summary = "Export vacation requests as CSV",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "CSV payload"),
        (status_code = StatusCode::BAD_REQUEST, description = "Unsupported format"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let format = req.query::<String>("format").unwrap_or_else(|| "csv".to_string());

    if format != "csv" {
        return Err(ApiError::bad_request(
            "unsupported_format",
            "Only csv exports are supported",
        ));
    }

    let filter = RequestFilter {
        status: req
            .query::<String>("status")
            .map(|raw| RequestStatus::from_str(&raw))
            .transpose()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown status filter"))?,
        user_uuid: req.query::<Uuid>("user").map(UserUuid::from_uuid),
        team_uuid: req.query::<Uuid>("team").map(TeamUuid::from_uuid),
        from: req.query::<String>("from").map(|raw| parse_date(&raw)).transpose()?,
        to: req.query::<String>("to").map(|raw| parse_date(&raw)).transpose()?,
    };

    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    let mut cursor = ExportCursor::default();

    loop {
        let batch = state
            .app
            .exports
            .fetch_batch(&principal, filter.clone(), cursor)
            .await
            .map_err(|export_error| match export_error {
                ExportsServiceError::NotAuthorized => ApiError::forbidden(),
                ExportsServiceError::CrossTenantAccess => ApiError::not_found(),
                ExportsServiceError::Sql(source) => {
                    error!("export query failed: {source}");

                    ApiError::internal()
                }
            })?;

        for row in &batch.rows {
            push_csv_row(&mut csv, row);
        }

        match batch.next {
            Some(next) => cursor = next,
            None => break,
        }
    }

    let _ = res.add_header("Content-Type", "text/csv; charset=utf-8", true);
    let _ = res.add_header(
        "Content-Disposition",
        "attachment; filename=\"vacations.csv\"",
        true,
    );

    res.render(csv);

    Ok(())
}

fn push_csv_row(csv: &mut String, row: &ExportRow) {
    let fields = [
        row.request_uuid.to_string(),
        row.email.clone(),
        row.first_name.clone(),
        row.last_name.clone(),
        row.team_code.clone().unwrap_or_default(),
        row.start_date.to_string(),
        row.end_date.to_string(),
        row.kind.clone(),
        row.status.clone(),
        row.days_count.to_string(),
        row.approver_email.clone().unwrap_or_default(),
        row.approved_at.map(|at| at.to_string()).unwrap_or_default(),
    ];

    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            csv.push(',');
        }
        push_csv_field(csv, field);
    }

    csv.push('\n');
}

/// Quote fields containing separators, quotes, or newlines.
fn push_csv_field(csv: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        csv.push('"');
        csv.push_str(&field.replace('"', "\"\""));
        csv.push('"');
    } else {
        csv.push_str(field);
    }
}
