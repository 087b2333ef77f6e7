//! Error types for the Concord system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Two families matter to callers: schema validation failures (recoverable,
//! reported per item) and configuration errors (fatal to the call that hit
//! them).

use std::fmt;

use thiserror::Error;

use crate::id::ItemId;
use crate::types::Type;

/// Result alias used throughout Concord.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Concord operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes a frame onto this error's context stack, creating the context
    /// if needed. Frames are pushed innermost first as the error unwinds.
    #[must_use]
    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Sets the context source (rule or rule set name) unless one is set.
    #[must_use]
    pub fn in_source(mut self, source: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(if context.source.is_some() {
            context
        } else {
            context.with_source(source)
        });
        self
    }

    /// Creates a schema validation error for a dimension.
    #[must_use]
    pub fn validation(dimension: impl Into<String>, reason: ValidationReason) -> Self {
        Self::new(ErrorKind::SchemaValidation {
            item: None,
            dimension: dimension.into(),
            reason,
        })
    }

    /// Attaches the offending item to a schema validation error.
    ///
    /// Other error kinds are returned unchanged.
    #[must_use]
    pub fn for_item(mut self, id: ItemId) -> Self {
        if let ErrorKind::SchemaValidation { item, .. } = &mut self.kind {
            *item = Some(id);
        }
        self
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(error: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration(error))
    }

    /// Creates an unknown operator error.
    #[must_use]
    pub fn unknown_operator(name: impl Into<String>) -> Self {
        Self::configuration(ConfigError::UnknownOperator(name.into()))
    }

    /// Creates a malformed condition error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::configuration(ConfigError::MalformedCondition(message.into()))
    }

    /// Creates an invalid search parameters error.
    #[must_use]
    pub fn invalid_search(message: impl Into<String>) -> Self {
        Self::configuration(ConfigError::InvalidSearch(message.into()))
    }

    /// Returns true if this is a schema validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::SchemaValidation { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration(_))
    }

    /// Returns the failing dimension of a schema validation error.
    #[must_use]
    pub fn dimension(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::SchemaValidation { dimension, .. } => Some(dimension),
            _ => None,
        }
    }

    /// Returns the reason of a schema validation error.
    #[must_use]
    pub fn validation_reason(&self) -> Option<&ValidationReason> {
        match &self.kind {
            ErrorKind::SchemaValidation { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Returns the configuration error, if this is one.
    #[must_use]
    pub fn config_error(&self) -> Option<&ConfigError> {
        match &self.kind {
            ErrorKind::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Self::configuration(error)
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Item attributes violate schema constraints.
    #[error("invalid attribute `{dimension}`{}: {reason}", on_item(.item.as_ref()))]
    SchemaValidation {
        /// The item being validated, when known.
        item: Option<ItemId>,
        /// The first dimension that failed.
        dimension: String,
        /// Why it failed.
        reason: ValidationReason,
    },

    /// Rules, conditions, schemas, or search parameters are ill-formed.
    #[error("configuration error: {0}")]
    Configuration(ConfigError),
}

fn on_item(item: Option<&ItemId>) -> String {
    item.map(|id| format!(" on item `{id}`")).unwrap_or_default()
}

/// Why an attribute value failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationReason {
    /// A required dimension has no value.
    Missing,
    /// The value's runtime kind does not match the dimension type.
    TypeMismatch {
        /// The declared type.
        expected: Type,
        /// The kind of value encountered.
        actual: &'static str,
    },
    /// A numeric value lies outside the inclusive bounds.
    OutOfRange {
        /// The offending value.
        value: f64,
        /// Declared minimum.
        min: Option<f64>,
        /// Declared maximum.
        max: Option<f64>,
    },
    /// An enumerated value is not in the declared value set.
    NotInValueSet {
        /// The offending value.
        value: String,
        /// The allowed values.
        allowed: Vec<String>,
    },
    /// A sequence element failed validation.
    Element {
        /// Zero-based element index.
        index: usize,
        /// Why the element failed.
        reason: Box<ValidationReason>,
    },
    /// The attribute names a dimension the schema does not declare.
    Undeclared,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "required dimension is missing"),
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, got {actual}")
            }
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {value} out of range [")?;
                match min {
                    Some(min) => write!(f, "{min}")?,
                    None => write!(f, "-inf")?,
                }
                write!(f, ", ")?;
                match max {
                    Some(max) => write!(f, "{max}")?,
                    None => write!(f, "inf")?,
                }
                write!(f, "]")
            }
            Self::NotInValueSet { value, allowed } => {
                write!(f, "`{value}` is not one of [{}]", allowed.join(", "))
            }
            Self::Element { index, reason } => write!(f, "element {index}: {reason}"),
            Self::Undeclared => write!(f, "dimension is not declared in the schema"),
        }
    }
}

/// Configuration errors: always fatal to the containing call.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A condition node names an operator outside the operator table.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A condition node has the wrong shape or invalid parameters.
    #[error("malformed condition: {0}")]
    MalformedCondition(String),

    /// A condition references a field the schema does not declare.
    #[error("field `{field}` is not a dimension of schema `{schema}`")]
    UndefinedDimension {
        /// The referenced field.
        field: String,
        /// The schema searched.
        schema: String,
    },

    /// A numeric operator met a non-numeric value.
    #[error("operator `{operator}` needs a numeric `{field}`, got {actual}")]
    NonNumericField {
        /// The operator name.
        operator: &'static str,
        /// The referenced field.
        field: String,
        /// The kind of value encountered.
        actual: &'static str,
    },

    /// A dimension declaration violates its own invariants.
    #[error("invalid dimension `{dimension}`: {reason}")]
    InvalidDimension {
        /// The dimension name.
        dimension: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two dimensions share a name.
    #[error("duplicate dimension: {0}")]
    DuplicateDimension(String),

    /// Two items share an identifier.
    #[error("duplicate item: {0}")]
    DuplicateItem(ItemId),

    /// An item identifier is not in the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// Search parameters are inconsistent.
    #[error("invalid search parameters: {0}")]
    InvalidSearch(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule or rule set name.
    pub source: Option<String>,
    /// Condition frames, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
