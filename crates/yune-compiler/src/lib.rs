//! Yune Compiler
//!
//! Semantic analysis and staged lowering for Yune modules.
//!
//! ## Architecture
//!
//! - **Scheduling**: collect the names each declaration uses, build a graph
//!   of `After` (type) and `Requires` (value) constraints and order it into
//!   stages
//! - **Analysis**: type check each declaration in schedule order, pulling
//!   in referenced declarations on demand, and lower it to the backend
//!
//! ## Modules
//!
//! - [`analyzer`]: Memoized, re-entrant declaration analysis
//! - [`backend`]: The backend trait, an in-memory buffer and a REPL process
//! - [`bridge`]: Decoding macro output into syntax
//! - [`const_eval`]: Compile-time folding of constant bodies
//! - [`declaration`]: Built-ins and the module's top-level declarations
//! - [`dependency`]: Static dependency collection
//! - [`lower`]: Target text for typed trees
//! - [`module`]: The module pass
//! - [`options`]: Compilation options
//! - [`scope`]: Declaration tables and captures
//! - [`staging`]: The staged scheduler
//! - [`typed`]: The typed intermediate tree

pub mod analyzer;
pub mod backend;
pub mod bridge;
pub mod const_eval;
pub mod declaration;
pub mod dependency;
pub mod lower;
pub mod module;
pub mod options;
pub mod scope;
pub mod staging;
pub mod typed;

pub use analyzer::{AnalysisState, Analyzer, Check, Halt};
pub use backend::{Backend, ProgramBuffer, ReplBackend};
pub use declaration::{Builtin, DeclId, Declaration, Declarations};
pub use dependency::DependencyGraph;
pub use module::{CompiledModule, compile_module};
pub use options::CompileOptions;
pub use scope::{Capture, DeclarationTable};
pub use staging::{Constraint, EvalNode, Schedule, StageGraph};
pub use typed::{TypedBlock, TypedExpr};

// Re-export the error types from core for convenience
pub use yune_core::{CompilationError, CompileFailure, FatalError};
