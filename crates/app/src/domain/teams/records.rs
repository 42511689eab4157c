//! Org structure records.

use jiff::Timestamp;

use crate::{
    domain::{companies::records::CompanyUuid, users::records::UserUuid},
    uuids::TypedUuid,
};

pub type FunctionUuid = TypedUuid<FunctionRecord>;
pub type TeamUuid = TypedUuid<TeamRecord>;
pub type MembershipUuid = TypedUuid<TeamMembershipRecord>;

/// Department within a company. Code is unique per company.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub uuid: FunctionUuid,
    pub company_uuid: CompanyUuid,
    pub name: String,
    pub code: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct NewFunction {
    pub uuid: FunctionUuid,
    pub company_uuid: CompanyUuid,
    pub name: String,
    pub code: String,
}

/// Team within a function. Code is unique per function.
#[derive(Debug, Clone)]
pub struct TeamRecord {
    pub uuid: TeamUuid,
    pub company_uuid: CompanyUuid,
    pub function_uuid: FunctionUuid,
    pub name: String,
    pub code: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub uuid: TeamUuid,
    pub company_uuid: CompanyUuid,
    pub function_uuid: FunctionUuid,
    pub name: String,
    pub code: String,
}

/// Membership rows are retained after leaving; active rows have no
/// `left_at`.
#[derive(Debug, Clone)]
pub struct TeamMembershipRecord {
    pub uuid: MembershipUuid,
    pub user_uuid: UserUuid,
    pub team_uuid: TeamUuid,
    pub is_primary: bool,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct ManagerAssignmentRecord {
    pub manager_uuid: UserUuid,
    pub team_uuid: TeamUuid,
    pub assigned_by: Option<UserUuid>,
    pub assigned_at: Timestamp,
}
