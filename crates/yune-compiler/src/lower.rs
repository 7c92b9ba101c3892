//! Lowering of checked trees to target-language text.
//!
//! Top-level declarations lower in two phases: a declaration that only
//! carries the signature, and a definition with the body. Blocks used as
//! values lower to a lambda that is invoked immediately.

use yune_core::{TypeValue, Value};

use crate::typed::{TypedBlock, TypedExpr, TypedExprKind, TypedStmt};

const INDENT: &str = "    ";

// ============================================================================
// Top-level declarations
// ============================================================================

/// A function signature ready for lowering.
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a> {
    pub name: &'a str,
    pub parameters: &'a [(String, TypeValue)],
    pub return_type: &'a TypeValue,
    /// The program entry point, lowered as `int main()`.
    pub is_entry_point: bool,
}

impl Signature<'_> {
    fn header(&self) -> String {
        if self.is_entry_point {
            return "int main()".to_string();
        }
        format!(
            "{} {}({})",
            self.return_type.lower(),
            self.name,
            lower_parameters(self.parameters)
        )
    }
}

pub fn function_declaration(signature: &Signature<'_>) -> String {
    format!("{};", signature.header())
}

pub fn function_definition(signature: &Signature<'_>, body: &TypedBlock) -> String {
    let mut writer = Writer::default();
    let sink = if signature.is_entry_point {
        Sink::Discard
    } else {
        Sink::Return
    };
    writer.statements(body, sink, 1);
    if signature.is_entry_point {
        writer.line(1, "return 0;");
    }
    format!("{} {{\n{}}}", signature.header(), writer.finish())
}

pub fn constant_declaration(name: &str, ty: &TypeValue) -> String {
    format!("extern {} {};", ty.lower(), name)
}

/// A constant whose value is computed by `body` at load time.
pub fn constant_definition(name: &str, ty: &TypeValue, body: &TypedBlock) -> String {
    format!("{} {} = {};", ty.lower(), name, block_value(body))
}

/// A constant whose value is already known.
pub fn constant_literal(name: &str, ty: &TypeValue, value: &Value) -> String {
    format!("{} {} = {};", ty.lower(), name, value.lower(ty))
}

// ============================================================================
// Expressions
// ============================================================================

pub fn expression(expr: &TypedExpr) -> String {
    match &expr.kind {
        TypedExprKind::Integer(v) => v.to_string(),
        TypedExprKind::Float(v) => Value::float(*v).lower(&expr.ty),
        TypedExprKind::Bool(v) => v.to_string(),
        TypedExprKind::String(v) => Value::String(v.clone()).lower(&expr.ty),
        TypedExprKind::Variable { name, .. } => name.clone(),
        TypedExprKind::Call {
            function,
            arguments,
        } => format!("{}({})", expression(function), expressions(arguments)),
        TypedExprKind::Tuple(elements) if expr.ty == TypeValue::Type => format!(
            "box(ty::TupleType{{ .elements = {{ {} }} }})",
            expressions(elements)
        ),
        TypedExprKind::Tuple(elements) => format!("std::make_tuple({})", expressions(elements)),
        TypedExprKind::List(elements) => format!("{}{{{}}}", expr.ty.lower(), expressions(elements)),
        TypedExprKind::Unary { op, operand } => format!("({}{})", op, expression(operand)),
        TypedExprKind::Binary { op, left, right } => format!(
            "({} {} {})",
            expression(left),
            op.lower(),
            expression(right)
        ),
        TypedExprKind::Closure {
            parameters,
            captures,
            body,
        } => {
            let mut writer = Writer::default();
            writer.statements(body, Sink::Return, 1);
            format!(
                "[{}]({}) -> {} {{\n{}}}",
                captures.join(", "),
                lower_parameters(parameters),
                body.ty.lower(),
                writer.finish()
            )
        }
        TypedExprKind::Value(value) => value.lower(&expr.ty),
    }
}

fn expressions(exprs: &[TypedExpr]) -> String {
    exprs.iter().map(expression).collect::<Vec<_>>().join(", ")
}

/// A block in expression position.
pub fn block_value(block: &TypedBlock) -> String {
    if let Some(expr) = block.as_expression() {
        return expression(expr);
    }
    let mut writer = Writer::default();
    writer.statements(block, Sink::Return, 1);
    format!("[&]() -> {} {{\n{}}}()", block.ty.lower(), writer.finish())
}

fn lower_parameters(parameters: &[(String, TypeValue)]) -> String {
    parameters
        .iter()
        .map(|(name, ty)| format!("{} {}", ty.lower(), name))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Statements
// ============================================================================

/// What happens to the value of a block's last statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Return,
    Discard,
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn finish(self) -> String {
        self.out
    }

    fn statements(&mut self, block: &TypedBlock, sink: Sink, depth: usize) {
        let count = block.statements.len();
        for (index, statement) in block.statements.iter().enumerate() {
            let is_last = index + 1 == count;
            self.statement(statement, if is_last { sink } else { Sink::Discard }, depth);
        }
        let needs_unit = match block.statements.last() {
            None => true,
            Some(TypedStmt::Variable { .. } | TypedStmt::Assignment { .. }) => true,
            Some(_) => false,
        };
        if sink == Sink::Return && needs_unit {
            self.line(depth, "return std::make_tuple();");
        }
    }

    fn statement(&mut self, statement: &TypedStmt, sink: Sink, depth: usize) {
        match statement {
            TypedStmt::Variable { name, ty, body, .. } => {
                let line = format!("{} {} = {};", ty.lower(), name, block_value(body));
                self.line(depth, &line);
            }
            TypedStmt::Assignment {
                target, op, body, ..
            } => {
                let line = format!("{} {} {};", target, op, block_value(body));
                self.line(depth, &line);
            }
            TypedStmt::Branch {
                condition,
                then,
                otherwise,
                ..
            } => {
                self.line(depth, &format!("if ({}) {{", expression(condition)));
                self.statements(then, sink, depth + 1);
                self.line(depth, "} else {");
                self.statements(otherwise, sink, depth + 1);
                self.line(depth, "}");
            }
            TypedStmt::Expression(expr) => {
                let lowered = expression(expr);
                match sink {
                    Sink::Return if expr.ty == TypeValue::Nil => {
                        self.line(depth, &format!("{lowered};"));
                        self.line(depth, "return;");
                    }
                    Sink::Return => self.line(depth, &format!("return {lowered};")),
                    Sink::Discard => self.line(depth, &format!("{lowered};")),
                }
            }
        }
    }
}
