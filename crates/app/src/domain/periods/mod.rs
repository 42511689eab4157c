//! Vacation periods, allocations, and balance projection.

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::CalendarServiceError;
pub use repository::PgCalendarRepository;
pub use service::{CalendarService, MockCalendarService, PgCalendarService};
