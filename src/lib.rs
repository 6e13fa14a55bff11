//! Cadence: multi-entity contact workflow automation.
//!
//! Routes incoming contacts across three business entities (The 7 Space,
//! AM Consulting, HigherSelf Core), selects entity-specific workflow
//! templates, executes their actions, and mirrors workflow state to Notion
//! behind a circuit-broken, retrying HTTP layer.
//!
//! Layers:
//! - [`domain`]: models, port traits, and the error taxonomy
//! - [`infrastructure`]: configuration, logging, and the resilient HTTP
//!   transport
//! - [`adapters`]: Notion, webhook, and in-memory port implementations
//! - [`services`]: the workflow engine, automation, orchestration, and the
//!   contact monitor
//! - [`cli`]: the `cadence` binary surface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::Config;
