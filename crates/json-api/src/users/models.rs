//! User response shape.
//!
//! Projected from the storage record so the password hash cannot leak
//! through a response body.

use furlough_app::domain::users::records::UserRecord;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UserResponse {
    pub uuid: Uuid,
    pub company_uuid: Uuid,
    pub function_uuid: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            uuid: user.uuid.into_uuid(),
            company_uuid: user.company_uuid.into_uuid(),
            function_uuid: user.function_uuid.map(Into::into),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
            email_verified: user.email_verified,
            last_login_at: user.last_login_at.map(|at| at.to_string()),
            created_at: user.created_at.to_string(),
        }
    }
}
