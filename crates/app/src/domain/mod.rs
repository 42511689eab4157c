//! Domain areas: records, repositories, and services per area.

pub mod audit;
pub mod companies;
pub mod exports;
pub mod periods;
pub mod requests;
pub mod sessions;
pub mod teams;
pub mod users;
