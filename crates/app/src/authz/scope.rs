//! Scope predicates.

use crate::{
    authz::Principal,
    domain::{companies::records::CompanyUuid, teams::records::TeamUuid, users::records::UserUuid},
};

/// Which users' rows an operation may touch, inside the tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    /// Any row in the company.
    Any,

    /// Only rows owned by the principal.
    Own,

    /// Rows owned by active members of the given teams.
    ManagedTeams(Vec<TeamUuid>),

    /// The principal's own rows plus active members of the given teams.
    OwnOrManagedTeams(Vec<TeamUuid>),
}

/// A structured filter repositories bind into every query.
///
/// The company bound is unconditional; the user bound narrows further by
/// role. Queries that cannot consume a scope do not exist in this codebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub company: CompanyUuid,
    pub principal_uuid: UserUuid,
    pub users: UserScope,
}

impl Scope {
    #[must_use]
    pub fn company_wide(principal: &Principal) -> Self {
        Self {
            company: principal.company_uuid,
            principal_uuid: principal.user_uuid,
            users: UserScope::Any,
        }
    }

    #[must_use]
    pub fn own(principal: &Principal) -> Self {
        Self {
            company: principal.company_uuid,
            principal_uuid: principal.user_uuid,
            users: UserScope::Own,
        }
    }

    #[must_use]
    pub fn managed_teams(principal: &Principal) -> Self {
        Self {
            company: principal.company_uuid,
            principal_uuid: principal.user_uuid,
            users: UserScope::ManagedTeams(principal.managed_teams.iter().copied().collect()),
        }
    }

    #[must_use]
    pub fn own_or_managed_teams(principal: &Principal) -> Self {
        Self {
            company: principal.company_uuid,
            principal_uuid: principal.user_uuid,
            users: UserScope::OwnOrManagedTeams(principal.managed_teams.iter().copied().collect()),
        }
    }

    /// Flatten the user bound into the three parameters every scoped query
    /// binds: an any-user flag, an optional owner uuid, and a team uuid
    /// array for the active-membership EXISTS clause. Variants that do not
    /// use a parameter bind a value that can never match.
    #[must_use]
    pub fn user_predicate_binds(&self) -> ScopeBinds {
        match &self.users {
            UserScope::Any => ScopeBinds {
                any_user: true,
                own_user: None,
                team_uuids: Vec::new(),
            },
            UserScope::Own => ScopeBinds {
                any_user: false,
                own_user: Some(self.principal_uuid),
                team_uuids: Vec::new(),
            },
            UserScope::ManagedTeams(teams) => ScopeBinds {
                any_user: false,
                own_user: None,
                team_uuids: teams.clone(),
            },
            UserScope::OwnOrManagedTeams(teams) => ScopeBinds {
                any_user: false,
                own_user: Some(self.principal_uuid),
                team_uuids: teams.clone(),
            },
        }
    }
}

/// Flattened scope parameters for binding into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeBinds {
    pub any_user: bool,
    pub own_user: Option<UserUuid>,
    pub team_uuids: Vec<TeamUuid>,
}
