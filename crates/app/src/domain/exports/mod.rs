//! Scope-filtered export projection.

pub mod records;
pub mod repository;
pub mod service;

pub use repository::PgExportsRepository;
pub use service::{ExportsService, ExportsServiceError, MockExportsService, PgExportsService};
