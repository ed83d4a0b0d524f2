//! Validator model: synchronous rules, asynchronous refinements and the
//! execution helpers used by a validation layer.

pub mod plugin;
pub mod rule;
pub mod tracker;
pub mod validator;

pub use plugin::{PluginError, PluginRefinement, PluginValidator, Refinement};
pub use rule::{Rule, ValueShape};
pub use tracker::{ValidationTicket, ValidationTracker};
pub use validator::{
    validate_all, EmptinessFn, Issue, Severity, ValidationReport, ValidationResult, Validator, ValidatorMap,
};
