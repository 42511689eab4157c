//! User records.

use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{companies::records::CompanyUuid, teams::records::FunctionUuid},
    uuids::TypedUuid,
};

pub type UserUuid = TypedUuid<UserRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Full user row. Never serialized; API layers project their own shapes so
/// the password hash cannot leak through a response.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub uuid: UserUuid,
    pub company_uuid: CompanyUuid,
    pub function_uuid: Option<FunctionUuid>,
    pub email: String,

    /// Unset until the invite is accepted.
    pub password_hash: Option<String>,

    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl UserRecord {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: UserUuid,
    pub company_uuid: CompanyUuid,
    pub function_uuid: Option<FunctionUuid>,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub function_uuid: Option<FunctionUuid>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// List filter; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub function_uuid: Option<FunctionUuid>,
    pub is_active: Option<bool>,

    /// Case-insensitive substring over email and names.
    pub search: Option<String>,
}
