//! Permission decisions.

use thiserror::Error;

use crate::{
    authz::{Principal, Scope},
    domain::{companies::records::CompanyUuid, users::records::Role},
};

/// Resource classes the kernel rules over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Company,
    Function,
    Team,
    VacationRequest,
    VacationPeriod,
    VacationAllocation,
    AuditEvent,
    Invite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    Approve,
    Reject,
    Cancel,
}

/// What a caller wants to do, independent of any target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub resource: Resource,
    pub action: Action,
}

impl Operation {
    #[must_use]
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDenied {
    #[error("operation not permitted for this role")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,
}

/// Decide an operation for a principal.
///
/// Pure: the decision is a function of the principal snapshot and the
/// operation alone, so identical inputs always produce identical outputs.
/// On `Ok` the returned [`Scope`] must be bound into every query that
/// fulfils the operation.
pub fn authorize(principal: &Principal, op: Operation) -> Result<Scope, AuthzDenied> {
    use Action::{Approve, Cancel, Create, Delete, List, Read, Reject, Update};
    use Resource::{
        AuditEvent, Company, Function, Invite, Team, User, VacationAllocation, VacationPeriod,
        VacationRequest,
    };

    let scope = match (op.resource, principal.role, op.action) {
        // Admins operate company-wide, with two carve-outs: the audit trail
        // is read-only for everyone, and admins never self-approve (the
        // request engine enforces approver != owner on top of this scope).
        (AuditEvent, Role::Admin, List | Read) => Scope::company_wide(principal),
        (AuditEvent, _, _) => return Err(AuthzDenied::NotAuthorized),

        (Invite, Role::Admin, Create | List | Delete) => Scope::company_wide(principal),
        (Invite, _, _) => return Err(AuthzDenied::NotAuthorized),

        (_, Role::Admin, _) => Scope::company_wide(principal),

        // Company, function, and team metadata is readable tenant-wide.
        (Company | Function | Team, _, List | Read) => Scope::company_wide(principal),

        // Managers maintain membership of the teams they manage.
        (Team, Role::Manager, Update) => Scope::managed_teams(principal),

        (User, Role::Manager, List | Read) => Scope::own_or_managed_teams(principal),
        (User, _, List | Read | Update) => Scope::own(principal),

        (VacationRequest, Role::Manager, List | Read) => Scope::own_or_managed_teams(principal),
        (VacationRequest, Role::Manager, Approve | Reject) => Scope::managed_teams(principal),
        (VacationRequest, _, List | Read | Create | Update | Cancel) => Scope::own(principal),

        (VacationPeriod, _, List | Read) => Scope::company_wide(principal),

        (VacationAllocation, Role::Manager, List | Read) => {
            Scope::own_or_managed_teams(principal)
        }
        (VacationAllocation, _, List | Read) => Scope::own(principal),

        _ => return Err(AuthzDenied::NotAuthorized),
    };

    Ok(scope)
}

/// Refuse any object whose company differs from the principal's.
///
/// Checked on every entity the core touches; a mismatch is audited by the
/// caller and surfaced to read endpoints as not-found so foreign tenants
/// cannot probe for existence.
pub fn ensure_same_company(
    principal: &Principal,
    entity_company: CompanyUuid,
) -> Result<(), AuthzDenied> {
    if principal.company_uuid == entity_company {
        Ok(())
    } else {
        Err(AuthzDenied::CrossTenantAccess)
    }
}
