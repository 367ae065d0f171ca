//! Error types and non-fatal diagnostics for test-input generation.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::TypeDescriptor;

/// Raised when `element()` is read from an exhausted sequence.
///
/// This is always a caller contract violation: combinators check
/// `has_element()` before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no current element: the sequence is exhausted")]
pub struct EmptyStateError;

/// A constructor hook rejected its arguments.
///
/// Speculative generation produces invalid-by-construction candidates all the
/// time, so this is swallowed wherever it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("construction failed: {reason}")]
pub struct ConstructionFailure {
    pub reason: String,
}

impl ConstructionFailure {
    /// Create a construction failure with the given reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why the instantiator could not produce candidates for one type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstantiationError {
    /// More than one constructor accepts the argument types
    #[error("{ty}: {count} constructors accept ({arguments}); refusing to guess")]
    AmbiguousConstructor {
        ty: TypeDescriptor,
        count: usize,
        arguments: String,
    },

    /// No constructor accepts the argument types
    #[error("{ty}: no constructor accepts ({arguments})")]
    NoMatchingConstructor {
        ty: TypeDescriptor,
        arguments: String,
    },

    /// The matching constructor failed on its first argument tuple
    #[error("{ty}: constructor #{constructor} is unusable: {failure}")]
    ConstructionFailed {
        ty: TypeDescriptor,
        constructor: usize,
        #[source]
        failure: ConstructionFailure,
    },

    /// At least one argument position has no values to try
    #[error("{ty}: constructor #{constructor} has an argument with no candidate values")]
    NoArguments {
        ty: TypeDescriptor,
        constructor: usize,
    },
}

impl InstantiationError {
    /// The type whose candidate was dropped
    pub fn target(&self) -> &TypeDescriptor {
        match self {
            InstantiationError::AmbiguousConstructor { ty, .. }
            | InstantiationError::NoMatchingConstructor { ty, .. }
            | InstantiationError::ConstructionFailed { ty, .. }
            | InstantiationError::NoArguments { ty, .. } => ty,
        }
    }
}

/// Top-level errors returned to the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The parameter slots of an operation violate the metadata contract
    #[error("malformed parameter slots for {operation}: {reason}")]
    MalformedSlots { operation: String, reason: String },

    /// The requested operation is not part of the unit under test
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The generation configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GenerationError {
    /// Create a malformed-slots error
    pub fn malformed_slots(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSlots {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// A reportable, non-fatal condition found while resolving values.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The type resolved to an empty sequence
    NoCoverage { ty: TypeDescriptor },
    /// A candidate was dropped because several constructors matched
    AmbiguousConstructor { ty: TypeDescriptor, count: usize },
    /// A candidate was dropped because its constructor could not be used
    UnusableConstructor { ty: TypeDescriptor, reason: String },
    /// A recursive occurrence was truncated to the null boundary value
    CycleTruncated { ty: TypeDescriptor },
}

impl Diagnostic {
    /// The type the diagnostic refers to
    pub fn ty(&self) -> &TypeDescriptor {
        match self {
            Diagnostic::NoCoverage { ty }
            | Diagnostic::AmbiguousConstructor { ty, .. }
            | Diagnostic::UnusableConstructor { ty, .. }
            | Diagnostic::CycleTruncated { ty } => ty,
        }
    }
}

impl From<&InstantiationError> for Diagnostic {
    fn from(error: &InstantiationError) -> Self {
        match error {
            InstantiationError::AmbiguousConstructor { ty, count, .. } => {
                Diagnostic::AmbiguousConstructor {
                    ty: ty.clone(),
                    count: *count,
                }
            }
            other => Diagnostic::UnusableConstructor {
                ty: other.target().clone(),
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoCoverage { ty } => write!(f, "no coverage: no values for {}", ty),
            Diagnostic::AmbiguousConstructor { ty, count } => {
                write!(f, "dropped {}: {} constructors matched", ty, count)
            }
            Diagnostic::UnusableConstructor { ty, reason } => {
                write!(f, "dropped {}: {}", ty, reason)
            }
            Diagnostic::CycleTruncated { ty } => {
                write!(f, "recursive occurrence of {} truncated to null", ty)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state_error_display() {
        assert_eq!(
            EmptyStateError.to_string(),
            "no current element: the sequence is exhausted"
        );
    }

    #[test]
    fn test_instantiation_error_display_and_target() {
        let error = InstantiationError::AmbiguousConstructor {
            ty: TypeDescriptor::parse("shapes.Box"),
            count: 2,
            arguments: "int".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "shapes.Box: 2 constructors accept (int); refusing to guess"
        );
        assert_eq!(error.target(), &TypeDescriptor::parse("shapes.Box"));
    }

    #[test]
    fn test_construction_failure_is_source() {
        use std::error::Error;

        let error = InstantiationError::ConstructionFailed {
            ty: TypeDescriptor::parse("Account"),
            constructor: 0,
            failure: ConstructionFailure::new("negative balance"),
        };
        let source = error.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("construction failed: negative balance")
        );
    }

    #[test]
    fn test_diagnostic_from_instantiation_error() {
        let ambiguous = InstantiationError::AmbiguousConstructor {
            ty: TypeDescriptor::parse("Amb"),
            count: 3,
            arguments: String::new(),
        };
        assert_eq!(
            Diagnostic::from(&ambiguous),
            Diagnostic::AmbiguousConstructor {
                ty: TypeDescriptor::parse("Amb"),
                count: 3
            }
        );

        let missing = InstantiationError::NoArguments {
            ty: TypeDescriptor::parse("Holder"),
            constructor: 1,
        };
        match Diagnostic::from(&missing) {
            Diagnostic::UnusableConstructor { ty, reason } => {
                assert_eq!(ty, TypeDescriptor::parse("Holder"));
                assert!(reason.contains("#1"));
            }
            other => panic!("unexpected diagnostic {:?}", other),
        }
    }

    #[test]
    fn test_generation_error_from_config_error() {
        let error: GenerationError = ConfigError::InvalidFraction(0.0).into();
        assert!(matches!(error, GenerationError::Config(_)));
        assert_eq!(
            GenerationError::malformed_slots("op", "gap at 1").to_string(),
            "malformed parameter slots for op: gap at 1"
        );
    }
}
