//! # Spacereg Template - Path-Template Engine
//!
//! Compiles the small templating language used to turn a `(user, space)` pair
//! into a path in the global namespace, e.g.
//! `/users/{{substr 0 1 .Space.Owner.Username}}/{{.Space.Owner.Username}}`.
//!
//! The language is deliberately closed: a fixed function set, a fixed set of
//! variable paths, and static argument typing. Anything else is rejected when
//! the template is compiled, so a configuration either loads completely or
//! not at all.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Template errors
pub mod error;

/// Helper functions
pub mod function;

mod parser;

/// Compiled templates
pub mod template;

/// Variable references
pub mod variable;

pub use error::TemplateError;
pub use function::{Function, Value, ValueType};
pub use template::PathTemplate;
pub use variable::{SpaceField, UserField, Variable};
