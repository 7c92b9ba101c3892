//! The module pass.
//!
//! 1. Merge built-ins and user declarations, rejecting duplicate names.
//! 2. Collect dependencies and schedule the declarations into stages.
//! 3. Analyze every declaration in schedule order. A declaration pulled in
//!    earlier by a reference is not analyzed again.
//! 4. Check that every declaration was either defined or failed.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use yune_ast::Module;
use yune_core::{CompileFailure, FatalError, InternalError, Name, TypeValue, Value};

use crate::analyzer::{AnalysisState, Analyzer};
use crate::backend::Backend;
use crate::declaration::{DeclId, Declaration, Declarations};
use crate::dependency::DependencyGraph;
use crate::options::CompileOptions;
use crate::scope::DeclarationTable;

/// Result of a successful module pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModule {
    /// Everything sent to the backend, in order.
    pub program: String,
    /// Declarations in the order they were defined.
    pub order: Vec<String>,
    /// Declaration names per scheduled stage.
    pub stages: Vec<Vec<String>>,
    pub types: FxHashMap<String, TypeValue>,
    /// Values known at compile time.
    pub values: FxHashMap<String, Value>,
    /// `(from, to)` for every resolution of a top-level name made while
    /// analyzing another top-level declaration.
    pub references: Vec<(String, String)>,
}

impl CompiledModule {
    pub fn type_of(&self, name: &str) -> Option<&TypeValue> {
        self.types.get(name)
    }

    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Analyze `module` and emit it to `backend`.
///
/// Diagnostics from every declaration are collected before failing. Fatal
/// errors stop the pass at once.
#[tracing::instrument(skip_all, fields(declarations = module.declarations.len()))]
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_module(
    module: &Module,
    backend: &mut dyn Backend,
    options: &CompileOptions,
) -> Result<CompiledModule, CompileFailure> {
    tracing::info!("module pass started");
    let declarations = Declarations::collect(module).map_err(CompileFailure::Diagnostics)?;

    let dependencies = DependencyGraph::collect(&declarations);
    let graph = dependencies.stage_graph(&declarations);
    let schedule = graph.schedule()?;

    let mut table = DeclarationTable::root(declarations.names(), options.dedup_captures);
    for (id, builtin) in declarations.builtins() {
        if let Err(error) = table.add(&Name::synthetic(builtin.name()), Declaration::TopLevel(id))
        {
            return Err(FatalError::from(InternalError::Other {
                message: error.to_string(),
            })
            .into());
        }
    }

    let references: Rc<RefCell<Vec<(DeclId, String)>>> = Rc::default();
    let sink = Rc::clone(&references);
    let mut state = AnalysisState::new(&declarations, backend, options).with_observer(
        move |from, name: &Name, declaration: &Declaration| {
            if let (Some(from), Declaration::TopLevel(_)) = (from, declaration) {
                sink.borrow_mut().push((from, name.string.clone()));
            }
        },
    );

    {
        let mut analyzer = Analyzer::new(&mut state, &table);
        for index in schedule.order() {
            if let Some(id) = graph.node(index).declaration {
                analyzer.analyze(id)?;
            }
        }
    }

    let settled = state.defined_count() + state.failed_count();
    if settled != declarations.len() {
        return Err(FatalError::from(InternalError::DefinedCountMismatch {
            defined: settled,
            declarations: declarations.len(),
        })
        .into());
    }

    let diagnostics = state.take_diagnostics();
    if !diagnostics.is_empty() {
        tracing::info!(errors = diagnostics.len(), "module pass failed");
        return Err(CompileFailure::Diagnostics(diagnostics));
    }

    let name = |id: DeclId| declarations.get(id).name().to_string();
    let stages = schedule
        .stages
        .iter()
        .map(|stage| stage.iter().map(|index| graph.node(*index).label.clone()).collect())
        .collect();
    let mut types = FxHashMap::default();
    let mut values = FxHashMap::default();
    for (id, _) in declarations.iter() {
        if let Some(ty) = state.type_of(id) {
            types.insert(name(id), ty.clone());
        }
        if let Some(value) = state.value_of(id) {
            values.insert(name(id), value.clone());
        }
    }
    let compiled = CompiledModule {
        program: state.backend().program(),
        order: state.order().iter().map(|id| name(*id)).collect(),
        stages,
        types,
        values,
        references: references
            .borrow()
            .iter()
            .map(|(from, to)| (name(*from), to.clone()))
            .collect(),
    };

    tracing::info!(defined = compiled.order.len(), "module pass finished");
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProgramBuffer;
    use yune_ast::{Block, ConstantDeclaration, Expression, TopLevelDeclaration};
    use yune_core::{CompilationError, Span};

    fn constant(name: &str, line: u32, body: Expression) -> TopLevelDeclaration {
        TopLevelDeclaration::Constant(ConstantDeclaration {
            span: Span::point(line, 1),
            name: Name::new(name, Span::point(line, 7)),
            ty: Expression::variable("Int", Span::point(line, 10)),
            body: Block::expression(body),
        })
    }

    #[test]
    fn schedule_order_drives_definitions() {
        // const b: Int = a + 1
        // const a: Int = 1
        let module = Module {
            declarations: vec![
                constant(
                    "b",
                    1,
                    Expression::binary(
                        yune_ast::BinaryOp::Add,
                        Expression::variable("a", Span::point(1, 16)),
                        Expression::int(1, Span::point(1, 20)),
                        Span::point(1, 18),
                    ),
                ),
                constant("a", 2, Expression::int(1, Span::point(2, 16))),
            ],
        };
        let mut backend = ProgramBuffer::new();
        let compiled = compile_module(&module, &mut backend, &CompileOptions::default()).unwrap();
        let user: Vec<&str> = compiled
            .order
            .iter()
            .map(String::as_str)
            .filter(|name| *name == "a" || *name == "b")
            .collect();
        assert_eq!(user, ["a", "b"]);
        assert_eq!(compiled.value_of("b"), Some(&Value::Int(2)));
        assert!(compiled.references.contains(&("b".to_string(), "a".to_string())));
        assert!(compiled.program.ends_with("int a = 1;\nextern int b;\nint b = 2;"));
    }

    #[test]
    fn duplicates_stop_before_analysis() {
        let module = Module {
            declarations: vec![
                constant("a", 1, Expression::int(1, Span::point(1, 16))),
                constant("a", 2, Expression::int(2, Span::point(2, 16))),
            ],
        };
        let mut backend = ProgramBuffer::new();
        let failure = compile_module(&module, &mut backend, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            failure.diagnostics(),
            [CompilationError::DuplicateDeclaration {
                name: "a".into(),
                first: Span::point(1, 7),
                second: Span::point(2, 7),
            }]
        );
        assert!(backend.entries().is_empty());
    }

    #[test]
    fn diagnostics_from_siblings_are_collected() {
        let module = Module {
            declarations: vec![
                constant("a", 1, Expression::bool(true, Span::point(1, 16))),
                constant("b", 2, Expression::string("x", Span::point(2, 16))),
                constant("c", 3, Expression::int(3, Span::point(3, 16))),
            ],
        };
        let mut backend = ProgramBuffer::new();
        let failure = compile_module(&module, &mut backend, &CompileOptions::default()).unwrap_err();
        assert_eq!(failure.diagnostics().len(), 2);
        assert!(backend.definitions().any(|d| d == "int c = 3;"));
    }

    #[test]
    fn cycles_are_fatal() {
        let module = Module {
            declarations: vec![constant("a", 1, Expression::variable("a", Span::point(1, 16)))],
        };
        let mut backend = ProgramBuffer::new();
        let failure = compile_module(&module, &mut backend, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            failure,
            CompileFailure::Fatal(FatalError::RequiresCycle {
                names: vec!["a".into()]
            })
        );
    }
}
