//! The authenticated actor.

use std::collections::HashSet;

use crate::domain::{
    companies::records::CompanyUuid,
    teams::records::TeamUuid,
    users::records::{Role, UserUuid},
};

/// A fully resolved principal for authorization decisions.
///
/// Built once per request after token verification: the role and managed
/// team set are re-read from the identity store, never trusted from token
/// claims. A token minted for a manager who has since been demoted
/// authorizes at user level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_uuid: UserUuid,
    pub company_uuid: CompanyUuid,
    pub role: Role,
    pub managed_teams: HashSet<TeamUuid>,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn manages(&self, team: TeamUuid) -> bool {
        self.managed_teams.contains(&team)
    }
}
