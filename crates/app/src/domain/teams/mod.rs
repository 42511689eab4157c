//! Org structure: functions, teams, memberships, manager assignments.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::OrgServiceError;
pub use repository::PgOrgRepository;
pub use service::{MockOrgService, OrgService, PgOrgService};
