//! Authorization kernel.
//!
//! Every core operation takes a [`Principal`] as its first argument and asks
//! [`authorize`] for a [`Scope`] before touching storage. The scope is a
//! structured predicate repositories are required to bind into their
//! queries; no call site composes tenant filters by hand.

mod kernel;
mod principal;
mod scope;

pub use kernel::*;
pub use principal::*;
pub use scope::*;
