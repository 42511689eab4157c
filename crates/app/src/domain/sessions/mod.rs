//! Session lifecycle: refresh tokens, invites, password resets.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::SessionsServiceError;
pub use repository::PgSessionsRepository;
pub use service::{MockSessionsService, PgSessionsService, SessionsService};
