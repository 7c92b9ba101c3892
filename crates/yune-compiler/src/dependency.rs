//! Static dependency collection between top-level declarations.
//!
//! Every top-level declaration depends on the names it mentions:
//!
//! - **type dependencies**: names used in type annotations and macro
//!   invocations. They have to be evaluated before the declaration can even
//!   be checked.
//! - **value dependencies**: names used in bodies. They only have to be
//!   analyzable by the time the declaration is.
//!
//! [`DependencyGraph::stage_graph`] turns these into scheduling constraints.

use rustc_hash::{FxHashMap, FxHashSet};
use yune_ast::{Block, Expression, Statement};
use yune_core::Name;

use crate::declaration::{DeclId, Declarations, TopLevel};
use crate::staging::{Constraint, EvalNode, StageGraph};

/// Names each top-level declaration depends on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    type_dependencies: FxHashMap<DeclId, Vec<Name>>,
    value_dependencies: FxHashMap<DeclId, Vec<Name>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every user declaration and record the free names it uses.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn collect(declarations: &Declarations<'_>) -> Self {
        let mut graph = Self::new();
        for (id, entry) in declarations.iter() {
            let mut collector = Collector {
                graph: &mut graph,
                node: id,
                scopes: Vec::new(),
            };
            match entry {
                TopLevel::Builtin(_) => {}
                TopLevel::Function(function) => {
                    for parameter in &function.parameters {
                        collector.annotation(&parameter.ty);
                    }
                    collector.annotation(&function.return_type);
                    collector.scopes.push(
                        function
                            .parameters
                            .iter()
                            .map(|p| p.name.string.clone())
                            .collect(),
                    );
                    collector.block(&function.body);
                }
                TopLevel::Constant(constant) => {
                    collector.annotation(&constant.ty);
                    collector.block(&constant.body);
                }
            }
        }
        graph
    }

    pub fn add_type_dependency(&mut self, node: DeclId, dependency: Name) {
        self.type_dependencies.entry(node).or_default().push(dependency);
    }

    pub fn add_value_dependency(&mut self, node: DeclId, dependency: Name) {
        self.value_dependencies.entry(node).or_default().push(dependency);
    }

    pub fn type_dependencies(&self, node: DeclId) -> &[Name] {
        self.type_dependencies.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn value_dependencies(&self, node: DeclId) -> &[Name] {
        self.value_dependencies.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Declarations reachable from `from` along a path with at least one
    /// type dependency. Those must be evaluated before `from` is checked.
    fn evaluated_before(
        &self,
        declarations: &Declarations<'_>,
        from: DeclId,
    ) -> FxHashSet<DeclId> {
        let mut reached = FxHashSet::default();
        let mut visited: FxHashSet<(DeclId, bool)> = FxHashSet::default();
        let mut stack = vec![(from, false)];
        while let Some((node, through_type)) = stack.pop() {
            if !visited.insert((node, through_type)) {
                continue;
            }
            if through_type {
                reached.insert(node);
            }
            let edges = self
                .type_dependencies(node)
                .iter()
                .map(|name| (name, true))
                .chain(self.value_dependencies(node).iter().map(|name| (name, false)));
            for (name, is_type) in edges {
                if let Some(dependency) = declarations.lookup(name.as_str()) {
                    stack.push((dependency, through_type || is_type));
                }
            }
        }
        reached
    }

    /// Convert to scheduling constraints. Node `i` of the result evaluates
    /// the declaration with index `i`.
    ///
    /// Type dependencies become `After` edges. Value dependencies become
    /// `Requires` edges, except between two functions: a function body only
    /// needs the other function's signature, which is what lets functions
    /// call each other recursively. The edge is kept when the callee's
    /// signature needs the caller evaluated, so the scheduler reports the
    /// cycle. Names that are not top-level declarations are left for the
    /// analyzer to report.
    pub fn stage_graph(&self, declarations: &Declarations<'_>) -> StageGraph {
        let mut graph = StageGraph::new();
        let nodes: Vec<_> = declarations
            .iter()
            .map(|(id, entry)| {
                let node = EvalNode::for_declaration(entry.name(), id);
                graph.add_node(if entry.is_builtin() {
                    node.precomputed()
                } else {
                    node
                })
            })
            .collect();

        let mut seen: FxHashSet<(DeclId, DeclId, Constraint)> = FxHashSet::default();
        let mut needed_first: FxHashMap<DeclId, FxHashSet<DeclId>> = FxHashMap::default();
        for (id, entry) in declarations.iter() {
            for name in self.type_dependencies(id) {
                let Some(dependency) = declarations.lookup(name.as_str()) else {
                    continue;
                };
                if seen.insert((id, dependency, Constraint::After)) {
                    graph.add_after(nodes[id.index()], nodes[dependency.index()]);
                }
            }
            for name in self.value_dependencies(id) {
                let Some(dependency) = declarations.lookup(name.as_str()) else {
                    continue;
                };
                if entry.is_function() && declarations.get(dependency).is_function() {
                    let needs_caller = needed_first
                        .entry(dependency)
                        .or_insert_with(|| self.evaluated_before(declarations, dependency))
                        .contains(&id);
                    if !needs_caller {
                        continue;
                    }
                }
                if seen.insert((id, dependency, Constraint::Requires)) {
                    graph.add_requires(nodes[id.index()], nodes[dependency.index()]);
                }
            }
        }
        graph
    }
}

/// Walks one declaration, skipping names bound by parameters and locals.
struct Collector<'g> {
    graph: &'g mut DependencyGraph,
    node: DeclId,
    scopes: Vec<Vec<String>>,
}

impl Collector<'_> {
    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.iter().any(|n| n == name))
    }

    fn annotation(&mut self, expr: &Expression) {
        self.expression(expr, true);
    }

    fn expression(&mut self, expr: &Expression, in_annotation: bool) {
        match expr {
            Expression::Integer { .. }
            | Expression::Float { .. }
            | Expression::Bool { .. }
            | Expression::String { .. }
            | Expression::TypeLiteral { .. } => {}
            Expression::Variable(name) => {
                if self.is_bound(name.as_str()) {
                    return;
                }
                if in_annotation {
                    self.graph.add_type_dependency(self.node, name.clone());
                } else {
                    self.graph.add_value_dependency(self.node, name.clone());
                }
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                self.expression(function, in_annotation);
                for argument in arguments {
                    self.expression(argument, in_annotation);
                }
            }
            Expression::Tuple { elements, .. } | Expression::List { elements, .. } => {
                for element in elements {
                    self.expression(element, in_annotation);
                }
            }
            Expression::Unary { operand, .. } => self.expression(operand, in_annotation),
            Expression::Binary { left, right, .. } => {
                self.expression(left, in_annotation);
                self.expression(right, in_annotation);
            }
            Expression::Macro(m) => {
                // The expansion runs the macro function during analysis.
                if !self.is_bound(m.function.as_str()) {
                    self.graph.add_type_dependency(self.node, m.function.clone());
                }
            }
            Expression::Closure(closure) => {
                for parameter in &closure.parameters {
                    self.annotation(&parameter.ty);
                }
                self.annotation(&closure.return_type);
                self.scopes.push(
                    closure
                        .parameters
                        .iter()
                        .map(|p| p.name.string.clone())
                        .collect(),
                );
                self.block(&closure.body);
                self.scopes.pop();
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(Vec::new());
        for statement in &block.statements {
            match statement {
                Statement::Variable(variable) => {
                    self.annotation(&variable.ty);
                    self.block(&variable.body);
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.push(variable.name.string.clone());
                    }
                }
                Statement::Assignment { target, body, .. } => {
                    if !self.is_bound(target.as_str()) {
                        self.graph.add_value_dependency(self.node, target.clone());
                    }
                    self.block(body);
                }
                Statement::Branch {
                    condition,
                    then,
                    otherwise,
                    ..
                } => {
                    self.expression(condition, false);
                    self.block(then);
                    self.block(otherwise);
                }
                Statement::Expression(expr) => self.expression(expr, false),
            }
        }
        self.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Builtin;
    use yune_ast::{
        BinaryOp, ConstantDeclaration, FunctionDeclaration, FunctionParameter, Macro, Module,
        TopLevelDeclaration, VariableDeclaration,
    };
    use yune_core::{FatalError, Span};

    fn at() -> Span {
        Span::point(1, 1)
    }

    fn var(name: &str) -> Expression {
        Expression::variable(name, at())
    }

    fn function(
        name: &str,
        params: &[(&str, &str)],
        ret: &str,
        body: Expression,
    ) -> TopLevelDeclaration {
        TopLevelDeclaration::Function(FunctionDeclaration {
            span: at(),
            name: Name::new(name, at()),
            parameters: params
                .iter()
                .map(|(n, t)| FunctionParameter::new(Name::new(*n, at()), var(t)))
                .collect(),
            return_type: var(ret),
            body: Block::expression(body),
        })
    }

    fn constant(name: &str, ty: Expression, body: Expression) -> TopLevelDeclaration {
        TopLevelDeclaration::Constant(ConstantDeclaration {
            span: at(),
            name: Name::new(name, at()),
            ty,
            body: Block::expression(body),
        })
    }

    fn names(list: &[Name]) -> Vec<&str> {
        list.iter().map(Name::as_str).collect()
    }

    fn labels(graph: &StageGraph) -> Vec<String> {
        graph
            .schedule()
            .unwrap()
            .order()
            .map(|n| graph.node(n).label.clone())
            .filter(|label| Builtin::ALL.iter().all(|b| b.name() != label.as_str()))
            .collect()
    }

    #[test]
    fn annotations_are_type_dependencies() {
        let module = Module {
            declarations: vec![function(
                "f",
                &[("x", "Int")],
                "Bool",
                Expression::binary(BinaryOp::Less, var("x"), var("limit"), at()),
            )],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations);
        let f = declarations.lookup("f").unwrap();

        assert_eq!(names(graph.type_dependencies(f)), ["Int", "Bool"]);
        // Parameters are bound, free names are not.
        assert_eq!(names(graph.value_dependencies(f)), ["limit"]);
    }

    #[test]
    fn local_variables_are_not_dependencies() {
        let body = Block::new(
            vec![
                Statement::Variable(VariableDeclaration {
                    span: at(),
                    name: Name::new("y", at()),
                    ty: var("Int"),
                    body: Block::expression(var("seed")),
                }),
                Statement::Expression(var("y")),
            ],
            at(),
        );
        let module = Module {
            declarations: vec![TopLevelDeclaration::Constant(ConstantDeclaration {
                span: at(),
                name: Name::new("c", at()),
                ty: var("Int"),
                body,
            })],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations);
        let c = declarations.lookup("c").unwrap();

        assert_eq!(names(graph.type_dependencies(c)), ["Int", "Int"]);
        assert_eq!(names(graph.value_dependencies(c)), ["seed"]);
    }

    #[test]
    fn macro_function_is_a_type_dependency() {
        let expansion = Expression::Macro(Macro {
            span: at(),
            function: Name::new("sql", at()),
            lines: Vec::new(),
        });
        let module = Module {
            declarations: vec![constant("q", var("String"), expansion)],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations);
        let q = declarations.lookup("q").unwrap();
        assert_eq!(names(graph.type_dependencies(q)), ["String", "sql"]);
        assert!(graph.value_dependencies(q).is_empty());
    }

    #[test]
    fn constants_are_ordered_by_use() {
        let module = Module {
            declarations: vec![
                constant("a", var("Int"), var("b")),
                constant("b", var("Int"), Expression::int(1, at())),
            ],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert_eq!(labels(&graph), ["b", "a"]);
    }

    #[test]
    fn mutually_recursive_functions_schedule() {
        let module = Module {
            declarations: vec![
                function("f", &[], "Int", Expression::call(var("g"), vec![], at())),
                function("g", &[], "Int", Expression::call(var("f"), vec![], at())),
            ],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert_eq!(labels(&graph), ["f", "g"]);
    }

    #[test]
    fn callee_signature_needing_the_caller_is_a_mixed_cycle() {
        // fn pick(): Type -> a
        // fn a(x: pick()): Int -> x
        let a = TopLevelDeclaration::Function(FunctionDeclaration {
            span: at(),
            name: Name::new("a", at()),
            parameters: vec![FunctionParameter::new(
                Name::new("x", at()),
                Expression::call(var("pick"), vec![], at()),
            )],
            return_type: var("Int"),
            body: Block::expression(var("x")),
        });
        let module = Module {
            declarations: vec![function("pick", &[], "Type", var("a")), a],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert_eq!(
            graph.schedule(),
            Err(FatalError::MixedCycle {
                name: "pick".into(),
                missing: vec!["a".into()],
            })
        );
    }

    #[test]
    fn self_referencing_constant_is_a_cycle() {
        let module = Module {
            declarations: vec![constant("a", var("Int"), var("a"))],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert_eq!(
            graph.schedule(),
            Err(FatalError::RequiresCycle {
                names: vec!["a".into()],
            })
        );
    }

    #[test]
    fn type_used_before_it_exists_is_an_after_cycle() {
        // const T: T = Int
        let module = Module {
            declarations: vec![constant("T", var("T"), var("Int"))],
        };
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert!(matches!(
            graph.schedule(),
            Err(FatalError::AfterCycle { names }) if names == ["T"]
        ));
    }

    #[test]
    fn builtins_are_precomputed() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let graph = DependencyGraph::collect(&declarations).stage_graph(&declarations);
        assert_eq!(graph.len(), declarations.len());
        let schedule = graph.schedule().unwrap();
        assert!(schedule.order().all(|n| graph.node(n).is_precomputed));
    }
}
