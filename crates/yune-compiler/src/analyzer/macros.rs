//! Macro expansion.
//!
//! A macro invocation names a function of type
//! `Fn((String, Type), (String, Expression))`. The function runs in the
//! backend with the macro's text and the type expected at the invocation.
//! It returns an error message, empty on success, and the expression that
//! replaces the invocation.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use xxhash_rust::xxh64::xxh64;
use yune_ast::Macro;
use yune_core::{CompilationError, InternalError, TypeValue, Value};

use super::{Analyzer, Check};
use crate::bridge::{self, MacroArena};
use crate::declaration::Declaration;
use crate::typed::TypedExpr;

/// Backend results of macro expansions. Entries are bucketed by the xxh64
/// hash of the request and matched on its full text.
#[derive(Debug, Default)]
pub(super) struct MacroCache {
    buckets: FxHashMap<u64, Vec<(String, Json)>>,
}

impl MacroCache {
    fn get(&self, text: &str) -> Option<&Json> {
        self.buckets
            .get(&xxh64(text.as_bytes(), 0))?
            .iter()
            .find(|(request, _)| request == text)
            .map(|(_, data)| data)
    }

    fn insert(&mut self, text: String, data: Json) {
        self.buckets
            .entry(xxh64(text.as_bytes(), 0))
            .or_default()
            .push((text, data));
    }
}

pub(super) fn expand_macro(
    analyzer: &mut Analyzer<'_, '_, '_>,
    invocation: &Macro,
    hint: Option<&TypeValue>,
) -> Check<TypedExpr> {
    let name = invocation.function.as_str();
    let (declaration, function_type) = analyzer.get_type(&invocation.function)?;
    if function_type != TypeValue::macro_function() {
        return Err(analyzer.report(CompilationError::UnexpectedType {
            expected: TypeValue::macro_function(),
            found: function_type,
            span: invocation.function.span,
        }));
    }

    let undefined = matches!(
        declaration,
        Declaration::TopLevel(id) if !analyzer.state.defined.contains(&id)
    );
    if undefined {
        return Err(InternalError::EvaluatedBeforeDefinition {
            name: name.to_string(),
        }
        .into());
    }

    // The expected type is the first arena entry, so output may refer back
    // to it by id.
    let expected = hint.cloned().unwrap_or(TypeValue::Nil);
    let mut arena = MacroArena::new();
    arena.register(expected.clone());

    let text = format!(
        "{}({}, {})",
        name,
        Value::String(invocation.text()).lower(&TypeValue::String),
        expected.lower_value()
    );
    let data = match analyzer.state.macro_cache.get(&text) {
        Some(data) => {
            tracing::trace!(name, "macro expansion cached");
            data.clone()
        }
        None => {
            tracing::trace!(text = %text, "evaluate");
            let data = analyzer.state.backend.evaluate(&text)?;
            analyzer.state.macro_cache.insert(text, data.clone());
            data
        }
    };

    let (message, expression) = match bridge::decode_output(&data, &arena, invocation.span) {
        Ok(output) => output,
        Err(source) => {
            return Err(analyzer.report(CompilationError::InvalidMacroOutput {
                name: name.to_string(),
                source,
                span: invocation.span,
            }));
        }
    };
    if !message.is_empty() {
        return Err(analyzer.report(CompilationError::MacroFailed {
            name: name.to_string(),
            message,
            span: invocation.span,
        }));
    }

    tracing::debug!(name, "macro expanded");
    analyzer.infer(&expression, hint)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::super::tests::{at, constant, function, ty, with_analyzer};
    use super::MacroCache;
    use crate::backend::ProgramBuffer;
    use serde_json::{Value as Json, json};
    use yune_ast::{Block, Expression, MacroLine, Module};
    use yune_core::{CompilationError, DecodeError, FatalError, InternalError, Name, TypeValue};

    fn invoke(function: &str, text: &str) -> Expression {
        Expression::Macro(yune_ast::Macro {
            span: at(5, 16),
            function: Name::new(function, at(5, 16)),
            lines: vec![MacroLine {
                span: at(6, 5),
                text: text.to_string(),
            }],
        })
    }

    /// `fn expand(text: String, ty: Type): (String, Expression) -> expand(text, ty)`
    /// plus one constant per `(name, annotation, macro text)`.
    fn module(constants: &[(&str, &str, &str)]) -> Module {
        let mut declarations = vec![function(
            "expand",
            vec![("text", ty("String")), ("ty", ty("Type"))],
            Expression::tuple(vec![ty("String"), ty("Expression")], at(1, 40)),
            Block::expression(Expression::call(
                Expression::variable("expand", at(1, 70)),
                vec![
                    Expression::variable("text", at(1, 77)),
                    Expression::variable("ty", at(1, 83)),
                ],
                at(1, 70),
            )),
        )];
        for (name, annotation, text) in constants {
            declarations.push(constant(name, ty(annotation), invoke("expand", text)));
        }
        Module { declarations }
    }

    fn output(message: &str, expression: Json) -> Json {
        json!({
            "$tag": "Tuple",
            "elements": [{"$tag": "String", "value": message}, expression],
        })
    }

    fn analyze_all(module: &Module, backend: &mut ProgramBuffer) -> Vec<CompilationError> {
        let names: Vec<String> = module
            .declarations
            .iter()
            .map(|decl| decl.name().string.clone())
            .collect();
        let (_, diagnostics) = with_analyzer(module, backend, |analyzer| {
            for name in &names {
                let id = analyzer.state().declarations.lookup(name).unwrap();
                analyzer.analyze(id).unwrap();
            }
        });
        diagnostics
    }

    #[test]
    fn cache_hit_needs_the_same_request_text() {
        let mut cache = MacroCache::default();
        cache.insert("expand(a)".to_string(), json!(1));
        // A different request stored under the hash of `expand(b)`.
        let key = xxhash_rust::xxh64::xxh64(b"expand(b)", 0);
        cache
            .buckets
            .entry(key)
            .or_default()
            .push(("expand(c)".to_string(), json!(3)));

        assert_eq!(cache.get("expand(a)"), Some(&json!(1)));
        assert_eq!(cache.get("expand(b)"), None);
        cache.insert("expand(b)".to_string(), json!(2));
        assert_eq!(cache.get("expand(b)"), Some(&json!(2)));
        assert_eq!(cache.get("expand(c)"), None);
    }

    #[test]
    fn macro_function_must_be_defined_first() {
        // fn expand(text: String, ty: Type): (String, Expression) -> expand# again
        let module = Module {
            declarations: vec![function(
                "expand",
                vec![("text", ty("String")), ("ty", ty("Type"))],
                Expression::tuple(vec![ty("String"), ty("Expression")], at(1, 40)),
                Block::expression(invoke("expand", "again")),
            )],
        };
        let mut backend = ProgramBuffer::new()
            .with_evaluator(|_| Ok(output("", json!({"$tag": "IntegerLiteral", "value": 1}))));
        let (result, _) = with_analyzer(&module, &mut backend, |analyzer| {
            let id = analyzer.state().declarations.lookup("expand").unwrap();
            analyzer.analyze(id)
        });
        assert_eq!(
            result,
            Err(FatalError::Internal(InternalError::EvaluatedBeforeDefinition {
                name: "expand".into()
            }))
        );
        assert!(backend.evaluations().is_empty());
    }

    #[test]
    fn expansion_replaces_the_invocation() {
        let module = module(&[("answer", "Int", "forty two")]);
        let mut backend = ProgramBuffer::new().with_evaluator(|_| {
            Ok(output("", json!({"$tag": "IntegerLiteral", "value": 42})))
        });
        let diagnostics = analyze_all(&module, &mut backend);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            backend.evaluations(),
            [r#"expand(std::string("forty two"), ty::IntType{})"#]
        );
        assert!(backend.definitions().any(|d| d == "int answer = 42;"));
    }

    #[test]
    fn output_may_refer_to_the_expected_type() {
        let module = module(&[("t", "Type", "whatever")]);
        let mut backend = ProgramBuffer::new().with_evaluator(|_| {
            Ok(output(
                "",
                json!({"$tag": "TypeLiteral", "value": {"$tag": "TypeId", "value": "0"}}),
            ))
        });
        let diagnostics = analyze_all(&module, &mut backend);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        // The expected type of a `Type` constant is `Type` itself.
        assert!(backend
            .definitions()
            .any(|d| d == "ty::Type t = ty::TypeType{};"));
    }

    #[test]
    fn identical_expansions_are_evaluated_once() {
        let module = module(&[("a", "Int", "same"), ("b", "Int", "same"), ("c", "Float", "same")]);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut backend = ProgramBuffer::new().with_evaluator(move |text| {
            counter.set(counter.get() + 1);
            if text.contains("FloatType") {
                Ok(output("", json!({"$tag": "FloatLiteral", "value": 1.5})))
            } else {
                Ok(output("", json!({"$tag": "IntegerLiteral", "value": 1})))
            }
        });
        let diagnostics = analyze_all(&module, &mut backend);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        // `a` and `b` share one expansion; `c` expects another type.
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn macro_errors() {
        let module = module(&[("failed", "Int", "x"), ("garbage", "Int", "y")]);
        let mut backend = ProgramBuffer::new().with_evaluator(|text| {
            if text.contains("\"x\"") {
                Ok(output(
                    "unknown table",
                    json!({"$tag": "IntegerLiteral", "value": 0}),
                ))
            } else {
                Ok(json!({"$tag": "Int", "value": 0}))
            }
        });
        let diagnostics = analyze_all(&module, &mut backend);
        assert_eq!(
            diagnostics,
            vec![
                CompilationError::MacroFailed {
                    name: "expand".into(),
                    message: "unknown table".into(),
                    span: at(5, 16),
                },
                CompilationError::InvalidMacroOutput {
                    name: "expand".into(),
                    source: DecodeError::UnknownTag { tag: "Int".into() },
                    span: at(5, 16),
                },
            ]
        );
    }

    #[test]
    fn macro_function_must_have_macro_type() {
        let module = Module {
            declarations: vec![
                function(
                    "plain",
                    vec![("text", ty("String"))],
                    ty("Int"),
                    Block::expression(Expression::int(0, at(1, 30))),
                ),
                constant("a", ty("Int"), invoke("plain", "1")),
            ],
        };
        let mut backend = ProgramBuffer::new();
        let diagnostics = analyze_all(&module, &mut backend);
        assert_eq!(
            diagnostics,
            vec![CompilationError::UnexpectedType {
                expected: TypeValue::macro_function(),
                found: TypeValue::function_of(vec![TypeValue::String], TypeValue::Int),
                span: at(5, 16),
            }]
        );
        assert!(backend.evaluations().is_empty());
    }
}
