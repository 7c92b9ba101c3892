//! Yune
//!
//! Front door to the Yune compiler core. Build a [`ast::Module`], pick a
//! [`Backend`], and run the module pass:
//!
//! ```
//! use yune::prelude::*;
//! use yune::ast::{Block, ConstantDeclaration, Expression, Module, TopLevelDeclaration};
//!
//! // const a: Int = 1 + 2
//! let at = Span::point(1, 1);
//! let module = Module {
//!     declarations: vec![TopLevelDeclaration::Constant(ConstantDeclaration {
//!         span: at,
//!         name: Name::new("a", at),
//!         ty: Expression::variable("Int", at),
//!         body: Block::expression(Expression::binary(
//!             yune::ast::BinaryOp::Add,
//!             Expression::int(1, at),
//!             Expression::int(2, at),
//!             at,
//!         )),
//!     })],
//! };
//! let compiled = yune::compile(&module, &CompileOptions::default()).unwrap();
//! assert_eq!(compiled.value_of("a"), Some(&Value::Int(3)));
//! ```

pub use yune_ast as ast;
pub use yune_compiler as compiler;
pub use yune_core as core;

pub use yune_compiler::{Backend, CompileOptions, CompiledModule, ProgramBuffer, ReplBackend};
pub use yune_core::{CompilationError, CompileFailure, FatalError};

use yune_ast::Module;

// Re-export main types
pub mod prelude {
    pub use yune_compiler::{
        Backend, CompileOptions, CompiledModule, ProgramBuffer, ReplBackend, compile_module,
    };
    pub use yune_core::{
        BackendError, CompilationError, CompileFailure, FatalError, Name, Span, TypeValue, Value,
    };
}

/// Compile `module` into an in-memory program.
///
/// Nothing can be evaluated at compile time, so annotations and constants
/// must fold. Use [`compile_with`] to supply a backend that evaluates.
pub fn compile(module: &Module, options: &CompileOptions) -> Result<CompiledModule, CompileFailure> {
    let mut backend = ProgramBuffer::new();
    compile_with(module, &mut backend, options)
}

/// Compile `module`, sending every declaration to `backend`.
pub fn compile_with(
    module: &Module,
    backend: &mut dyn Backend,
    options: &CompileOptions,
) -> Result<CompiledModule, CompileFailure> {
    yune_compiler::compile_module(module, backend, options)
}
