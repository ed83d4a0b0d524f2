//! Form schema model and type registry
//!
//! `formwork-fields` owns everything about a form that is not a tree walk:
//! the node types parsed from a JSON schema, dotted-path addressing into the
//! value store, the capability registry that gives each node type its
//! behavior, visibility conditions, and the two-phase validator model.
//!
//! # Architecture
//!
//! - **Open dispatch**: node behavior comes from a [`CapabilityBundle`] looked
//!   up by type tag in a [`TypeRegistry`]; new types register without touching
//!   the resolvers
//! - **No globals**: the registry lives in an explicit [`FormContext`]
//! - **Schema-tolerant**: unknown type tags are diagnosed, not rejected
//! - **Two-phase validators**: synchronous rules plus an optional async
//!   refinement, built cheaply and run later

pub mod builtin;
pub mod condition;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod path;
pub mod registry;
pub mod types;
pub mod validation;
pub mod value;

pub use condition::{ConditionEvaluator, ConditionScope, DeclarativeConditions};
pub use context::{FormContext, FormContextBuilder};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{FieldsError, Result};
pub use path::{child_path, get_path, owns_segment, row_path, set_path};
pub use registry::{CapabilityBundle, HideState, TypeRegistry};
pub use types::{Column, Conditional, Node, NodeKind, Schema, ValidateSpec, DEFAULT_ROW_LABEL};
pub use validation::{
    validate_all, EmptinessFn, Issue, PluginError, PluginValidator, Refinement, Rule, Severity,
    ValidationReport, ValidationResult, ValidationTracker, Validator, ValidatorMap, ValueShape,
};
pub use value::is_blank;
