//! Decoding of macro output.
//!
//! A macro function returns `(String, Expression)`: an error message that is
//! empty on success, and a syntax tree encoded as tagged JSON. Type values
//! exchanged during one expansion live in a [`MacroArena`] and are
//! referenced by index.

use serde_json::{Map, Value as Json};
use yune_ast::{BinaryOp, Expression, UnaryOp};
use yune_core::value::{decode_type, tagged};
use yune_core::{DecodeError, Name, Span, TypeValue, Value};

/// Types referenced by id during one macro expansion.
#[derive(Debug, Default)]
pub struct MacroArena {
    types: Vec<TypeValue>,
}

impl MacroArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type and return its id.
    pub fn register(&mut self, ty: TypeValue) -> usize {
        if let Some(index) = self.types.iter().position(|t| *t == ty) {
            return index;
        }
        self.types.push(ty);
        self.types.len() - 1
    }

    pub fn types(&self) -> &[TypeValue] {
        &self.types
    }
}

/// Split a macro result into its message and expression.
///
/// Every decoded node gets `span`, the location of the macro invocation.
pub fn decode_output(
    data: &Json,
    arena: &MacroArena,
    span: Span,
) -> Result<(String, Expression), DecodeError> {
    let (tag, object) = tagged(data)?;
    if tag != "Tuple" {
        return Err(DecodeError::UnknownTag {
            tag: tag.to_string(),
        });
    }
    let [message, expression] = array(tag, object, "elements")? else {
        return Err(bad_field(tag, "elements"));
    };
    let Value::String(message) = Value::from_json(message, arena.types())? else {
        return Err(bad_field(tag, "elements"));
    };
    let expression = decode_expression(expression, arena, span)?;
    Ok((message, expression))
}

/// Decode one tagged expression node.
pub fn decode_expression(
    data: &Json,
    arena: &MacroArena,
    span: Span,
) -> Result<Expression, DecodeError> {
    let (tag, object) = tagged(data)?;
    let field = |name: &'static str| object.get(name).ok_or_else(|| bad_field(tag, name));
    let nested = |name: &'static str| decode_expression(field(name)?, arena, span);

    let expression = match tag {
        "IntegerLiteral" => Expression::int(
            field("value")?
                .as_i64()
                .ok_or_else(|| bad_field(tag, "value"))?,
            span,
        ),
        "FloatLiteral" => Expression::float(
            field("value")?
                .as_f64()
                .ok_or_else(|| bad_field(tag, "value"))?,
            span,
        ),
        "BoolLiteral" => Expression::bool(
            field("value")?
                .as_bool()
                .ok_or_else(|| bad_field(tag, "value"))?,
            span,
        ),
        "StringLiteral" => Expression::string(string(tag, object, "value")?, span),
        "TypeLiteral" => Expression::TypeLiteral {
            span,
            value: decode_type(field("value")?, arena.types())?,
        },
        "Variable" => Expression::Variable(Name::new(string(tag, object, "value")?, span)),
        "FunctionCall" => {
            let function = nested("function")?;
            // A tuple argument spreads into one argument per element.
            let arguments = match nested("argument")? {
                Expression::Tuple { elements, .. } => elements,
                single => vec![single],
            };
            Expression::call(function, arguments, span)
        }
        "TupleExpression" => Expression::tuple(elements(tag, object, arena, span)?, span),
        "ListExpression" => Expression::list(elements(tag, object, arena, span)?, span),
        "UnaryExpression" => {
            let op = match string(tag, object, "op")? {
                "-" => UnaryOp::Negate,
                "!" => UnaryOp::Not,
                _ => return Err(bad_field(tag, "op")),
            };
            Expression::unary(op, nested("expression")?, span)
        }
        "BinaryExpression" => {
            let op = BinaryOp::parse(string(tag, object, "op")?)
                .ok_or_else(|| bad_field(tag, "op"))?;
            Expression::binary(op, nested("left")?, nested("right")?, span)
        }
        other => {
            return Err(DecodeError::UnknownTag {
                tag: other.to_string(),
            });
        }
    };
    Ok(expression)
}

fn elements(
    tag: &str,
    object: &Map<String, Json>,
    arena: &MacroArena,
    span: Span,
) -> Result<Vec<Expression>, DecodeError> {
    array(tag, object, "elements")?
        .iter()
        .map(|element| decode_expression(element, arena, span))
        .collect()
}

fn array<'j>(
    tag: &str,
    object: &'j Map<String, Json>,
    field: &'static str,
) -> Result<&'j [Json], DecodeError> {
    object
        .get(field)
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| bad_field(tag, field))
}

fn string<'j>(
    tag: &str,
    object: &'j Map<String, Json>,
    field: &'static str,
) -> Result<&'j str, DecodeError> {
    object
        .get(field)
        .and_then(Json::as_str)
        .ok_or_else(|| bad_field(tag, field))
}

fn bad_field(tag: &str, field: &'static str) -> DecodeError {
    DecodeError::BadField {
        tag: tag.to_string(),
        field,
    }
}
