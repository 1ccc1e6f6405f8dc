//! Template errors

use spacereg_core::RegistryError;

/// Errors raised while compiling or rendering a path template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Malformed template text
    #[error("parse error at offset {position}: {message}")]
    Parse {
        /// Byte offset in the template source
        position: usize,
        /// What went wrong
        message: String,
    },

    /// Function outside the fixed function set
    #[error("unknown function '{name}' at offset {position}")]
    UnknownFunction {
        /// Name as written
        name: String,
        /// Byte offset in the template source
        position: usize,
    },

    /// Variable path outside the known fields
    #[error("unknown variable '{path}' at offset {position}")]
    UnknownVariable {
        /// Path as written
        path: String,
        /// Byte offset in the template source
        position: usize,
    },

    /// Wrong number of arguments
    #[error("function '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        /// Function name
        name: &'static str,
        /// Declared arity
        expected: usize,
        /// Supplied arguments, including a piped value
        actual: usize,
    },

    /// Argument of the wrong type
    #[error("function '{name}' argument {index}: expected {expected}, got {actual}")]
    Type {
        /// Function name
        name: &'static str,
        /// Zero-based argument index
        index: usize,
        /// Declared type
        expected: &'static str,
        /// Supplied type
        actual: &'static str,
    },

    /// A referenced value is absent at render time
    #[error("missing value for '{path}'")]
    MissingValue {
        /// Path of the absent value
        path: String,
    },
}

impl TemplateError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::MissingValue { path: path.into() }
    }

    /// True for errors that can only occur while rendering
    pub fn is_render_error(&self) -> bool {
        matches!(self, Self::MissingValue { .. })
    }
}

impl From<TemplateError> for RegistryError {
    fn from(err: TemplateError) -> Self {
        if err.is_render_error() {
            RegistryError::template_evaluation(err.to_string())
        } else {
            RegistryError::config(err.to_string())
        }
    }
}
