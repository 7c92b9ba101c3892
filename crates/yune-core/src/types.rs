//! The type-value system.
//!
//! Types are first-class compile-time values: a type annotation is an
//! expression of type [`TypeValue::Type`] whose value is another
//! [`TypeValue`]. Equality is structural and recursive, so the derived
//! `PartialEq` is the equality used throughout the compiler.
//!
//! Every variant has two lowerings to the target language:
//!
//! - [`TypeValue::lower`]: the target's type syntax, used in declarations.
//! - [`TypeValue::lower_value`]: the type as a runtime value, used when a type
//!   is passed to code running in the backend (macros, type-valued constants).

use std::fmt;

/// Name of the struct type macros produce.
pub const EXPRESSION_STRUCT: &str = "Expression";

/// A structural type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeValue {
    /// The type of types.
    Type,
    Int,
    Float,
    Bool,
    String,
    Nil,
    Tuple(Vec<TypeValue>),
    List(Box<TypeValue>),
    /// Function type. The argument is conventionally a tuple, even for a
    /// single logical parameter.
    Fn {
        argument: Box<TypeValue>,
        ret: Box<TypeValue>,
    },
    Struct(String),
}

impl TypeValue {
    /// The empty tuple, the type of statements that produce no value.
    pub fn unit() -> Self {
        TypeValue::Tuple(Vec::new())
    }

    pub fn list(element: TypeValue) -> Self {
        TypeValue::List(Box::new(element))
    }

    pub fn function(argument: TypeValue, ret: TypeValue) -> Self {
        TypeValue::Fn {
            argument: Box::new(argument),
            ret: Box::new(ret),
        }
    }

    /// Function type taking the given parameters as a tuple argument.
    pub fn function_of(params: Vec<TypeValue>, ret: TypeValue) -> Self {
        Self::function(TypeValue::Tuple(params), ret)
    }

    /// Required signature of the entry point: `Fn((), ())`.
    pub fn main_signature() -> Self {
        Self::function(Self::unit(), Self::unit())
    }

    /// Type of the syntax trees produced by macros.
    pub fn expression() -> Self {
        TypeValue::Struct(EXPRESSION_STRUCT.to_string())
    }

    /// Required type of a macro function:
    /// `Fn((String, Type), (String, Expression))`.
    pub fn macro_function() -> Self {
        Self::function_of(
            vec![TypeValue::String, TypeValue::Type],
            TypeValue::Tuple(vec![TypeValue::String, Self::expression()]),
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeValue::Int | TypeValue::Float)
    }

    /// Argument and return type if this is a function type.
    pub fn as_function(&self) -> Option<(&TypeValue, &TypeValue)> {
        match self {
            TypeValue::Fn { argument, ret } => Some((argument, ret)),
            _ => None,
        }
    }

    /// Lower to the target language's type syntax.
    pub fn lower(&self) -> String {
        match self {
            TypeValue::Type => "ty::Type".to_string(),
            TypeValue::Int => "int".to_string(),
            TypeValue::Float => "float".to_string(),
            TypeValue::Bool => "bool".to_string(),
            TypeValue::String => "std::string".to_string(),
            TypeValue::Nil => "void".to_string(),
            TypeValue::Tuple(elements) => format!("std::tuple<{}>", lower_all(elements)),
            TypeValue::List(element) => format!("std::vector<{}>", element.lower()),
            TypeValue::Fn { argument, ret } => match argument.as_ref() {
                TypeValue::Tuple(params) if params.is_empty() => {
                    format!("ty::Function<{}>", ret.lower())
                }
                TypeValue::Tuple(params) => {
                    format!("ty::Function<{}, {}>", ret.lower(), lower_all(params))
                }
                other => format!("ty::Function<{}, {}>", ret.lower(), other.lower()),
            },
            TypeValue::Struct(name) => format!("ty::{name}"),
        }
    }

    /// Lower to a runtime value describing this type.
    pub fn lower_value(&self) -> String {
        match self {
            TypeValue::Type => "ty::TypeType{}".to_string(),
            TypeValue::Int => "ty::IntType{}".to_string(),
            TypeValue::Float => "ty::FloatType{}".to_string(),
            TypeValue::Bool => "ty::BoolType{}".to_string(),
            TypeValue::String => "ty::StringType{}".to_string(),
            TypeValue::Nil => "ty::NilType{}".to_string(),
            TypeValue::Tuple(elements) => {
                let elements: Vec<String> = elements.iter().map(TypeValue::lower_value).collect();
                format!(
                    "box(ty::TupleType{{ .elements = {{ {} }} }})",
                    elements.join(", ")
                )
            }
            TypeValue::List(element) => {
                format!("box(ty::ListType{{ .element = {} }})", element.lower_value())
            }
            TypeValue::Fn { argument, ret } => format!(
                "box(ty::FnType{{ .argument = {}, .returnType = {} }})",
                argument.lower_value(),
                ret.lower_value()
            ),
            TypeValue::Struct(name) => format!("box(ty::StructType{{ .name = \"{name}\" }})"),
        }
    }
}

fn lower_all(types: &[TypeValue]) -> String {
    types
        .iter()
        .map(TypeValue::lower)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeValue::Type => f.write_str("Type"),
            TypeValue::Int => f.write_str("Int"),
            TypeValue::Float => f.write_str("Float"),
            TypeValue::Bool => f.write_str("Bool"),
            TypeValue::String => f.write_str("String"),
            TypeValue::Nil => f.write_str("Nil"),
            TypeValue::Tuple(elements) => {
                f.write_str("(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str(")")
            }
            TypeValue::List(element) => write!(f, "List({element})"),
            TypeValue::Fn { argument, ret } => write!(f, "Fn({argument}, {ret})"),
            TypeValue::Struct(name) => f.write_str(name),
        }
    }
}
