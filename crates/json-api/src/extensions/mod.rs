//! Handler extensions.

mod depot;

pub(crate) use depot::*;
