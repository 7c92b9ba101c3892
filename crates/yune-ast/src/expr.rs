//! Expression AST nodes.
//!
//! Expressions cover literals, variables, calls, tuples, lists, operators,
//! closures and macros. Type annotations are expressions as well: any
//! expression of type `Type` may appear where a type is expected.

use yune_core::{Name, Span, TypeValue};

use crate::decl::FunctionParameter;
use crate::ops::{BinaryOp, UnaryOp};
use crate::stmt::Block;

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Integer { span: Span, value: i64 },
    Float { span: Span, value: f64 },
    Bool { span: Span, value: bool },
    String { span: Span, value: String },
    /// A type known without evaluation. Produced by macro expansions.
    TypeLiteral { span: Span, value: TypeValue },
    /// Reference to a declaration by name.
    Variable(Name),
    /// Function call. A function whose argument type is a tuple is called
    /// with one argument per tuple element.
    Call {
        span: Span,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Tuple {
        span: Span,
        elements: Vec<Expression>,
    },
    List {
        span: Span,
        elements: Vec<Expression>,
    },
    Unary {
        span: Span,
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        span: Span,
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Macro(Macro),
    Closure(Closure),
}

impl Expression {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expression::Integer { span, .. }
            | Expression::Float { span, .. }
            | Expression::Bool { span, .. }
            | Expression::String { span, .. }
            | Expression::TypeLiteral { span, .. }
            | Expression::Call { span, .. }
            | Expression::Tuple { span, .. }
            | Expression::List { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. } => *span,
            Expression::Variable(name) => name.span,
            Expression::Macro(m) => m.span,
            Expression::Closure(c) => c.span,
        }
    }

    // Convenience constructors, mostly for building trees in tests and
    // from serialized macro output.

    pub fn int(value: i64, span: Span) -> Self {
        Expression::Integer { span, value }
    }

    pub fn float(value: f64, span: Span) -> Self {
        Expression::Float { span, value }
    }

    pub fn bool(value: bool, span: Span) -> Self {
        Expression::Bool { span, value }
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Expression::String {
            span,
            value: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Expression::Variable(Name::new(name, span))
    }

    pub fn call(function: Expression, arguments: Vec<Expression>, span: Span) -> Self {
        Expression::Call {
            span,
            function: Box::new(function),
            arguments,
        }
    }

    pub fn tuple(elements: Vec<Expression>, span: Span) -> Self {
        Expression::Tuple { span, elements }
    }

    pub fn list(elements: Vec<Expression>, span: Span) -> Self {
        Expression::List { span, elements }
    }

    pub fn unary(op: UnaryOp, operand: Expression, span: Span) -> Self {
        Expression::Unary {
            span,
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression, span: Span) -> Self {
        Expression::Binary {
            span,
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// A block of foreign target-language text, expanded at compile time by a
/// macro function.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub span: Span,
    /// Top-level function that expands the macro.
    pub function: Name,
    pub lines: Vec<MacroLine>,
}

impl Macro {
    /// The macro body as a single newline-joined string.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroLine {
    pub span: Span,
    pub text: String,
}

/// An anonymous function.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub span: Span,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Box<Expression>,
    pub body: Block,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Statement;

    #[test]
    fn span_of_variable_is_name_span() {
        let expr = Expression::variable("x", Span::new(2, 4, 1));
        assert_eq!(expr.span(), Span::new(2, 4, 1));
    }

    #[test]
    fn closure_nests_inside_expressions() {
        // (): Int -> (): Int -> 1
        let inner = Expression::Closure(Closure {
            span: Span::point(1, 12),
            parameters: Vec::new(),
            return_type: Box::new(Expression::variable("Int", Span::point(1, 16))),
            body: Block::expression(Expression::int(1, Span::point(1, 23))),
        });
        let outer = Expression::Closure(Closure {
            span: Span::point(1, 1),
            parameters: Vec::new(),
            return_type: Box::new(Expression::variable("Int", Span::point(1, 5))),
            body: Block::expression(inner.clone()),
        });
        assert_eq!(outer.span(), Span::point(1, 1));
        let Expression::Closure(closure) = &outer else {
            panic!("expected a closure");
        };
        assert_eq!(closure.body.statements, vec![Statement::Expression(inner)]);
    }

    #[test]
    fn macro_text_joins_lines() {
        let m = Macro {
            span: Span::point(1, 1),
            function: Name::new("sql", Span::point(1, 1)),
            lines: vec![
                MacroLine {
                    span: Span::point(2, 5),
                    text: "select *".into(),
                },
                MacroLine {
                    span: Span::point(3, 5),
                    text: "from t".into(),
                },
            ],
        };
        assert_eq!(m.text(), "select *\nfrom t");
    }
}
