//! Users and principal resolution.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::IdentityServiceError;
pub use repository::PgUsersRepository;
pub use service::{IdentityService, MockIdentityService, PgIdentityService};
