//! Error types for every phase of semantic analysis.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompilationError - user-facing diagnostics, accumulated per module pass
//! FatalError       - halts the module pass immediately
//! ├── AfterCycle / RequiresCycle / MixedCycle - no evaluation order exists
//! ├── InternalError - broken compiler invariants
//! └── BackendError  - the execution backend failed or misbehaved
//! ```
//!
//! Diagnostics are collected so one pass can report many of them. Fatal
//! errors are returned through `Result` and short-circuit with `?`.

use thiserror::Error;

use crate::{DecodeError, Span, TypeValue};

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors caused by the program being compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A referenced variable could not be found.
    #[error("at {span}: variable '{name}' is not defined")]
    UndefinedVariable { name: String, span: Span },

    /// A referenced type could not be found.
    #[error("at {span}: type '{name}' is not defined")]
    UndefinedType { name: String, span: Span },

    /// Two declarations share a name in the same scope.
    #[error("at {second}: '{name}' previously defined at {first} is redefined")]
    DuplicateDeclaration {
        name: String,
        /// Where the name was first declared.
        first: Span,
        /// Where the duplicate was declared.
        second: Span,
    },

    /// A function call target is not a function.
    #[error("at {span}: function call on non-function type '{found}'")]
    NotAFunction { found: TypeValue, span: Span },

    /// A tuple has the wrong number of elements.
    #[error("at {span}: expected {expected} element(s), found {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },

    /// A value of the wrong type was used, or a non-type was used as a type.
    #[error("at {span}: expected type '{expected}', found '{found}'")]
    UnexpectedType {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: expected variable type '{expected}' for assignment, found '{found}'")]
    AssignmentTypeMismatch {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: expected return type '{expected}', found '{found}'")]
    ReturnTypeMismatch {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: expected declared variable type '{expected}', found '{found}'")]
    VariableTypeMismatch {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: expected declared constant type '{expected}', found '{found}'")]
    ConstantTypeMismatch {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: expected argument type '{expected}', found '{found}'")]
    ArgumentTypeMismatch {
        expected: TypeValue,
        found: TypeValue,
        span: Span,
    },

    /// A branch condition is not `Bool`.
    #[error("at {span}: expected type 'Bool' for condition, found '{found}'")]
    InvalidConditionType { found: TypeValue, span: Span },

    /// The branches of a conditional have different types.
    #[error("at {then_span}: branch types '{then}' and '{otherwise}' (at {else_span}) are not equal")]
    BranchTypeNotEqual {
        then: TypeValue,
        then_span: Span,
        otherwise: TypeValue,
        else_span: Span,
    },

    /// The entry point does not have the signature `Fn((), ())`.
    #[error("at {span}: the entry point must have type '{}', found '{found}'", TypeValue::main_signature())]
    InvalidMainSignature { found: TypeValue, span: Span },

    #[error("at {span}: unary operator {op} cannot be applied to type '{found}'")]
    InvalidUnaryExpressionType {
        op: String,
        found: TypeValue,
        span: Span,
    },

    #[error("at {span}: binary operator {op} cannot be applied to types '{left}' and '{right}'")]
    InvalidBinaryExpressionTypes {
        op: String,
        left: TypeValue,
        right: TypeValue,
        span: Span,
    },

    /// Assignment to something that is not a local variable.
    #[error("at {span}: '{name}' cannot be assigned to")]
    InvalidAssignmentTarget { name: String, span: Span },

    /// A macro reported an error message.
    #[error("at {span}: macro '{name}' failed: {message}")]
    MacroFailed {
        name: String,
        message: String,
        span: Span,
    },

    /// A macro produced output that is not an expression.
    #[error("at {span}: macro '{name}' produced invalid output: {source}")]
    InvalidMacroOutput {
        name: String,
        source: DecodeError,
        span: Span,
    },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UndefinedVariable { span, .. } => *span,
            CompilationError::UndefinedType { span, .. } => *span,
            CompilationError::DuplicateDeclaration { second, .. } => *second,
            CompilationError::NotAFunction { span, .. } => *span,
            CompilationError::ArityMismatch { span, .. } => *span,
            CompilationError::UnexpectedType { span, .. } => *span,
            CompilationError::AssignmentTypeMismatch { span, .. } => *span,
            CompilationError::ReturnTypeMismatch { span, .. } => *span,
            CompilationError::VariableTypeMismatch { span, .. } => *span,
            CompilationError::ConstantTypeMismatch { span, .. } => *span,
            CompilationError::ArgumentTypeMismatch { span, .. } => *span,
            CompilationError::InvalidConditionType { span, .. } => *span,
            CompilationError::BranchTypeNotEqual { then_span, .. } => *then_span,
            CompilationError::InvalidMainSignature { span, .. } => *span,
            CompilationError::InvalidUnaryExpressionType { span, .. } => *span,
            CompilationError::InvalidBinaryExpressionTypes { span, .. } => *span,
            CompilationError::InvalidAssignmentTarget { span, .. } => *span,
            CompilationError::MacroFailed { span, .. } => *span,
            CompilationError::InvalidMacroOutput { span, .. } => *span,
        }
    }
}

// ============================================================================
// Fatal Errors
// ============================================================================

/// Errors that stop the whole module pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalError {
    /// Declarations must each be evaluated before the other.
    #[error("cyclic dependency between declarations: {}", .names.join(", "))]
    AfterCycle { names: Vec<String> },

    /// Declarations must each be visible before the other.
    #[error("circular definition between declarations: {}", .names.join(", "))]
    RequiresCycle { names: Vec<String> },

    /// A declaration requires something that is only known after it runs.
    #[error("'{name}' requires {} which can only be evaluated after it", .missing.join(", "))]
    MixedCycle { name: String, missing: Vec<String> },

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FatalError {
    /// Whether this error reports a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            FatalError::AfterCycle { .. }
                | FatalError::RequiresCycle { .. }
                | FatalError::MixedCycle { .. }
        )
    }
}

/// Result of a failed module pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileFailure {
    /// Every diagnostic collected during the pass, in discovery order.
    #[error("compilation failed with {} error(s): {}", .0.len(), join_diagnostics(.0))]
    Diagnostics(Vec<CompilationError>),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl CompileFailure {
    /// The collected diagnostics, empty for fatal failures.
    pub fn diagnostics(&self) -> &[CompilationError] {
        match self {
            CompileFailure::Diagnostics(errors) => errors,
            CompileFailure::Fatal(_) => &[],
        }
    }
}

fn join_diagnostics(errors: &[CompilationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Violated compiler invariants. These indicate a defect in the compiler,
/// never a problem with the program being compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalError {
    #[error("internal error: type of '{name}' is missing after analysis")]
    MissingType { name: String },

    #[error("internal error: '{name}' was defined twice")]
    AlreadyDefined { name: String },

    #[error("internal error: {defined} of {declarations} declarations were defined")]
    DefinedCountMismatch { defined: usize, declarations: usize },

    /// The backend was asked to run code using a declaration it has only
    /// seen declared.
    #[error("internal error: '{name}' was evaluated before its definition")]
    EvaluatedBeforeDefinition { name: String },

    /// A declaration was referenced while its own type was being computed.
    #[error("internal error: '{name}' was referenced while its type was being computed")]
    Reentrant { name: String },

    #[error("internal error: {message}")]
    Other { message: String },
}

/// Failures of the execution backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("backend i/o failed: {message}")]
    Io { message: String },

    #[error("backend did not answer within {millis} ms")]
    Timeout { millis: u128 },

    #[error("backend rejected {kind}: {message}")]
    Rejected { kind: String, message: String },

    #[error("backend protocol error: {message}")]
    Protocol { message: String },

    #[error("backend returned an undecodable value: {0}")]
    Decode(#[from] DecodeError),

    #[error("backend does not support {operation}")]
    Unsupported { operation: String },
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Protocol {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
