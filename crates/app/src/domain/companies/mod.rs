//! Companies: the root of every tenant subtree.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::CompaniesServiceError;
pub use repository::PgCompaniesRepository;
pub use service::{CompaniesService, MockCompaniesService, PgCompaniesService};
