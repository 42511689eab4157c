//! Vacation request lifecycle.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::RequestsServiceError;
pub use repository::PgRequestsRepository;
pub use service::{MockRequestsService, PgRequestsService, RequestsService};
