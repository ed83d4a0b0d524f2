//! Schema resolvers for formwork
//!
//! Given a parsed [`Schema`](formwork_fields::Schema) and a
//! [`FormContext`](formwork_fields::FormContext), this crate derives the
//! views a form needs from one value store:
//!
//! - [`initial_values`]: the defaults a fresh form starts from
//! - [`resolve_visibility`]: effective visibility, with hidden values cleared
//! - [`compose_validators`]: a path-keyed validator map over visible nodes
//! - [`missing_required`]: visible soft-required fields that are still empty
//!
//! [`FormEngine`] wires them together and iterates visibility until the store
//! is stable.
//!
//! ```rust
//! use formwork_engine::{EngineConfig, FormEngine};
//! use formwork_fields::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::from_json(r#"[{"type": "textfield", "key": "name"}]"#).unwrap();
//! let engine = FormEngine::with_config(schema, EngineConfig::default()).unwrap();
//! assert_eq!(engine.initial_values().unwrap(), json!({"name": ""}));
//! ```

pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod initial;
pub mod missing;
pub mod visibility;

pub use compose::compose_validators;
pub use config::EngineConfig;
pub use engine::{FormEngine, Resolution};
pub use error::{EngineError, Result};
pub use initial::initial_values;
pub use missing::{missing_required, MissingField};
pub use visibility::{find_resolved, resolve_visibility, ResolvedNode, VisibilityOutcome};
