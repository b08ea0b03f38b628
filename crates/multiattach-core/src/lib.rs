//! # multiattach-core
//!
//! Core types, traits, and engines for multiattach.
//!
//! This crate provides the registry lifecycle, the wizard-start form
//! augmenter, the wizard state machine and the attachment replication engine.
//! Persistence is reached only through the traits in [`traits`]; the
//! PostgreSQL backend lives in `multiattach-db` and an in-memory backend in
//! [`memory`].

pub mod defaults;
pub mod error;
pub mod form;
pub mod logging;
pub mod memory;
pub mod models;
pub mod registry;
pub mod replication;
pub mod traits;
pub mod view;
pub mod wizard;

// Re-export commonly used types at crate root
pub use error::{map_unique_violation, Error, Result};
pub use form::{augment, start_form};
pub use models::*;
pub use registry::{enabled_operations, RegistryManager};
pub use replication::{plan, replicate, ReplicationOutcome, ReplicationStep};
pub use traits::*;
pub use view::{DomainClause, FieldKind, FieldSpec, FormView, ViewElement};
pub use wizard::{WizardButton, WizardSession, WizardState};
