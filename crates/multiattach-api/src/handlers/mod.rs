//! HTTP handlers.
//!
//! Each handler runs its operation in one unit of work and commits only when
//! the operation succeeds.

pub mod registry;
pub mod wizard;
