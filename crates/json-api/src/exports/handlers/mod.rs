//! Export handlers.

pub(crate) mod vacations;
