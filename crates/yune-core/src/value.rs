//! Compile-time values and their tagged JSON encoding.
//!
//! The execution backend reports evaluated values as tagged JSON objects:
//!
//! ```text
//! {"$tag": "Int", "value": 3}
//! {"$tag": "Tuple", "elements": [{"$tag": "Bool", "value": true}]}
//! {"$tag": "Type", "value": {"$tag": "ListType", "element": {"$tag": "IntType"}}}
//! ```
//!
//! Type values may also reference an entry of the caller's type arena with
//! `{"$tag": "TypeId", "value": "<index>"}`.

use ordered_float::OrderedFloat;
use serde_json::{Map, Value as Json, json};
use thiserror::Error;

use crate::TypeValue;

/// Key holding the variant tag in encoded values.
pub const TAG: &str = "$tag";

/// Errors raised while decoding a tagged JSON value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected a tagged object, found {found}")]
    NotTagged { found: String },

    #[error("unknown tag '{tag}'")]
    UnknownTag { tag: String },

    #[error("missing or malformed field '{field}' in '{tag}'")]
    BadField { tag: String, field: &'static str },

    #[error("type id '{id}' does not refer to a registered type")]
    UnknownTypeId { id: String },
}

/// A value known at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    String(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Type(TypeValue),
    Nil,
}

impl Value {
    pub fn float(value: f64) -> Self {
        Value::Float(OrderedFloat(value))
    }

    /// Lower to a target-language literal of type `ty`.
    pub fn lower(&self, ty: &TypeValue) -> String {
        match (self, ty) {
            (Value::Int(v), _) => v.to_string(),
            (Value::Float(v), _) => format!("{:?}", v.into_inner()),
            (Value::Bool(v), _) => v.to_string(),
            (Value::String(v), _) => format!("std::string({})", Json::String(v.clone())),
            (Value::Tuple(elements), TypeValue::Tuple(types)) => {
                let lowered: Vec<String> = elements
                    .iter()
                    .zip(types)
                    .map(|(element, ty)| element.lower(ty))
                    .collect();
                format!("std::make_tuple({})", lowered.join(", "))
            }
            (Value::List(elements), TypeValue::List(element_type)) => {
                let lowered: Vec<String> = elements.iter().map(|e| e.lower(element_type)).collect();
                format!("{}{{{}}}", ty.lower(), lowered.join(", "))
            }
            (Value::Type(t), _) => t.lower_value(),
            (Value::Nil, _) => String::new(),
            (Value::Tuple(_) | Value::List(_), _) => format!("{}{{}}", ty.lower()),
        }
    }

    /// Encode as tagged JSON.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Int(v) => json!({ TAG: "Int", "value": v }),
            Value::Float(v) => json!({ TAG: "Float", "value": v.into_inner() }),
            Value::Bool(v) => json!({ TAG: "Bool", "value": v }),
            Value::String(v) => json!({ TAG: "String", "value": v }),
            Value::Tuple(elements) => json!({
                TAG: "Tuple",
                "elements": elements.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::List(elements) => json!({
                TAG: "List",
                "elements": elements.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::Type(t) => json!({ TAG: "Type", "value": encode_type(t) }),
            Value::Nil => json!({ TAG: "Nil" }),
        }
    }

    /// Decode a tagged JSON value. `type_ids` resolves `TypeId` references.
    pub fn from_json(data: &Json, type_ids: &[TypeValue]) -> Result<Value, DecodeError> {
        let (tag, object) = tagged(data)?;
        let value = match tag {
            "Int" => Value::Int(
                object
                    .get("value")
                    .and_then(Json::as_i64)
                    .ok_or_else(|| bad_field(tag, "value"))?,
            ),
            "Float" => Value::float(
                object
                    .get("value")
                    .and_then(Json::as_f64)
                    .ok_or_else(|| bad_field(tag, "value"))?,
            ),
            "Bool" => Value::Bool(
                object
                    .get("value")
                    .and_then(Json::as_bool)
                    .ok_or_else(|| bad_field(tag, "value"))?,
            ),
            "String" => Value::String(
                object
                    .get("value")
                    .and_then(Json::as_str)
                    .ok_or_else(|| bad_field(tag, "value"))?
                    .to_string(),
            ),
            "Tuple" => Value::Tuple(decode_elements(tag, object, type_ids)?),
            "List" => Value::List(decode_elements(tag, object, type_ids)?),
            "Type" => Value::Type(decode_type(
                object.get("value").ok_or_else(|| bad_field(tag, "value"))?,
                type_ids,
            )?),
            "Nil" => Value::Nil,
            other => {
                return Err(DecodeError::UnknownTag {
                    tag: other.to_string(),
                });
            }
        };
        Ok(value)
    }
}

/// Encode a type as tagged JSON.
pub fn encode_type(ty: &TypeValue) -> Json {
    match ty {
        TypeValue::Type => json!({ TAG: "TypeType" }),
        TypeValue::Int => json!({ TAG: "IntType" }),
        TypeValue::Float => json!({ TAG: "FloatType" }),
        TypeValue::Bool => json!({ TAG: "BoolType" }),
        TypeValue::String => json!({ TAG: "StringType" }),
        TypeValue::Nil => json!({ TAG: "NilType" }),
        TypeValue::Tuple(elements) => json!({
            TAG: "TupleType",
            "elements": elements.iter().map(encode_type).collect::<Vec<_>>(),
        }),
        TypeValue::List(element) => json!({ TAG: "ListType", "element": encode_type(element) }),
        TypeValue::Fn { argument, ret } => json!({
            TAG: "FnType",
            "argument": encode_type(argument),
            "return": encode_type(ret),
        }),
        TypeValue::Struct(name) => json!({ TAG: "StructType", "name": name }),
    }
}

/// Decode a tagged JSON type. `type_ids` resolves `TypeId` references.
pub fn decode_type(data: &Json, type_ids: &[TypeValue]) -> Result<TypeValue, DecodeError> {
    let (tag, object) = tagged(data)?;
    let field = |name: &'static str| object.get(name).ok_or_else(|| bad_field(tag, name));
    let ty = match tag {
        "TypeType" => TypeValue::Type,
        "IntType" => TypeValue::Int,
        "FloatType" => TypeValue::Float,
        "BoolType" => TypeValue::Bool,
        "StringType" => TypeValue::String,
        "NilType" => TypeValue::Nil,
        "TupleType" => TypeValue::Tuple(
            field("elements")?
                .as_array()
                .ok_or_else(|| bad_field(tag, "elements"))?
                .iter()
                .map(|element| decode_type(element, type_ids))
                .collect::<Result<_, _>>()?,
        ),
        "ListType" => TypeValue::list(decode_type(field("element")?, type_ids)?),
        "FnType" => TypeValue::function(
            decode_type(field("argument")?, type_ids)?,
            decode_type(field("return")?, type_ids)?,
        ),
        "StructType" => TypeValue::Struct(
            field("name")?
                .as_str()
                .ok_or_else(|| bad_field(tag, "name"))?
                .to_string(),
        ),
        "TypeId" => {
            let id = field("value")?
                .as_str()
                .ok_or_else(|| bad_field(tag, "value"))?;
            id.parse::<usize>()
                .ok()
                .and_then(|index| type_ids.get(index))
                .cloned()
                .ok_or_else(|| DecodeError::UnknownTypeId { id: id.to_string() })?
        }
        "Box" => decode_type(field("value")?, type_ids)?,
        other => {
            return Err(DecodeError::UnknownTag {
                tag: other.to_string(),
            });
        }
    };
    Ok(ty)
}

/// Split a tagged object into its tag and fields.
pub fn tagged(data: &Json) -> Result<(&str, &Map<String, Json>), DecodeError> {
    let object = data.as_object().ok_or_else(|| DecodeError::NotTagged {
        found: data.to_string(),
    })?;
    let tag = object
        .get(TAG)
        .and_then(Json::as_str)
        .ok_or_else(|| DecodeError::NotTagged {
            found: data.to_string(),
        })?;
    Ok((tag, object))
}

fn decode_elements(
    tag: &str,
    object: &Map<String, Json>,
    type_ids: &[TypeValue],
) -> Result<Vec<Value>, DecodeError> {
    object
        .get("elements")
        .and_then(Json::as_array)
        .ok_or_else(|| bad_field(tag, "elements"))?
        .iter()
        .map(|element| Value::from_json(element, type_ids))
        .collect()
}

fn bad_field(tag: &str, field: &'static str) -> DecodeError {
    DecodeError::BadField {
        tag: tag.to_string(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_int() {
        let value = Value::from_json(&json!({"$tag": "Int", "value": 3}), &[]).unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn decode_nested_tuple_with_type() {
        let data = json!({
            "$tag": "Tuple",
            "elements": [
                {"$tag": "String", "value": ""},
                {"$tag": "Type", "value": {"$tag": "Box", "value": {"$tag": "ListType", "element": {"$tag": "FloatType"}}}},
            ]
        });
        let value = Value::from_json(&data, &[]).unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![
                Value::String(String::new()),
                Value::Type(TypeValue::list(TypeValue::Float)),
            ])
        );
    }

    #[test]
    fn decode_type_id_uses_arena() {
        let arena = vec![TypeValue::Bool, TypeValue::Struct("Point".into())];
        let ty = decode_type(&json!({"$tag": "TypeId", "value": "1"}), &arena).unwrap();
        assert_eq!(ty, TypeValue::Struct("Point".into()));

        let missing = decode_type(&json!({"$tag": "TypeId", "value": "7"}), &arena);
        assert!(matches!(missing, Err(DecodeError::UnknownTypeId { .. })));
    }

    #[test]
    fn decode_rejects_untagged() {
        assert!(matches!(
            Value::from_json(&json!(3), &[]),
            Err(DecodeError::NotTagged { .. })
        ));
        assert!(matches!(
            Value::from_json(&json!({"$tag": "Mystery"}), &[]),
            Err(DecodeError::UnknownTag { .. })
        ));
        assert!(matches!(
            Value::from_json(&json!({"$tag": "Int", "value": "three"}), &[]),
            Err(DecodeError::BadField { field: "value", .. })
        ));
    }

    #[test]
    fn encoded_function_type_decodes() {
        let ty = TypeValue::macro_function();
        assert_eq!(decode_type(&encode_type(&ty), &[]).unwrap(), ty);
    }

    #[test]
    fn lower_literals() {
        assert_eq!(Value::Int(3).lower(&TypeValue::Int), "3");
        assert_eq!(Value::float(1.5).lower(&TypeValue::Float), "1.5");
        assert_eq!(
            Value::String("a\"b".into()).lower(&TypeValue::String),
            "std::string(\"a\\\"b\")"
        );
        let pair = TypeValue::Tuple(vec![TypeValue::Int, TypeValue::Bool]);
        assert_eq!(
            Value::Tuple(vec![Value::Int(1), Value::Bool(false)]).lower(&pair),
            "std::make_tuple(1, false)"
        );
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Int(2)]).lower(&TypeValue::list(TypeValue::Int)),
            "std::vector<int>{1, 2}"
        );
    }
}
