//! Abstract syntax tree for the Yune language.
//!
//! This crate only defines the tree. Front ends build a [`Module`] and hand
//! it to the compiler; nothing here resolves names or checks types.
//!
//! # Example
//!
//! ```
//! use yune_ast::*;
//! use yune_core::{Name, Span};
//!
//! // const a: Int = 1 + 2
//! let at = Span::point(1, 1);
//! let module = Module {
//!     declarations: vec![TopLevelDeclaration::Constant(ConstantDeclaration {
//!         span: at,
//!         name: Name::new("a", at),
//!         ty: Expression::variable("Int", at),
//!         body: Block::expression(Expression::binary(
//!             BinaryOp::Add,
//!             Expression::int(1, at),
//!             Expression::int(2, at),
//!             at,
//!         )),
//!     })],
//! };
//! assert_eq!(module.declarations[0].name().as_str(), "a");
//! ```

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use stmt::*;
