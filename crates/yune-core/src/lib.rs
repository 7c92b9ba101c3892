//! Core types shared by every Yune compiler crate.
//!
//! - [`span`]: source locations and names
//! - [`types`]: the structural type-value system
//! - [`value`]: compile-time values and their tagged JSON codec
//! - [`error`]: diagnostics, fatal errors and backend failures

pub mod error;
pub mod span;
pub mod types;
pub mod value;

pub use error::{BackendError, CompilationError, CompileFailure, FatalError, InternalError};
pub use span::{Name, Span};
pub use types::TypeValue;
pub use value::{DecodeError, Value};
