//! Integration tests for the staged scheduler.
//!
//! Schedules are checked against the constraints they were built from
//! rather than against one fixed order, except where only one order is valid.

use yune::ast::*;
use yune::compiler::{Constraint, EvalNode, Schedule, StageGraph};
use yune::prelude::*;

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;

/// Stage and position of every scheduled node.
fn positions(schedule: &Schedule) -> FxHashMap<NodeIndex, (usize, usize)> {
    let mut positions = FxHashMap::default();
    let mut position = 0;
    for (stage, nodes) in schedule.stages.iter().enumerate() {
        for node in nodes {
            positions.insert(*node, (stage, position));
            position += 1;
        }
    }
    positions
}

/// Panics unless every edge of `graph` holds in `schedule`.
fn assert_respects(graph: &StageGraph, nodes: &[NodeIndex], schedule: &Schedule) {
    let positions = positions(schedule);
    assert_eq!(positions.len(), nodes.len(), "every node is scheduled once");
    for node in nodes {
        let (stage, position) = positions[node];
        for dependency in graph.dependencies(*node, Constraint::After) {
            assert!(positions[&dependency].0 < stage, "After edge violated");
        }
        for dependency in graph.dependencies(*node, Constraint::Requires) {
            let (dependency_stage, dependency_position) = positions[&dependency];
            assert!(dependency_stage <= stage, "Requires edge crosses stages");
            assert!(dependency_position < position, "Requires edge out of order");
        }
    }
}

// =============================================================================
// Graph shapes
// =============================================================================

#[test]
fn test_diamond() {
    // top after left and right, both after bottom
    let mut graph = StageGraph::new();
    let top = graph.add_node(EvalNode::new("top"));
    let left = graph.add_node(EvalNode::new("left"));
    let right = graph.add_node(EvalNode::new("right"));
    let bottom = graph.add_node(EvalNode::new("bottom"));
    graph.add_after(top, left);
    graph.add_after(top, right);
    graph.add_after(left, bottom);
    graph.add_after(right, bottom);

    let schedule = graph.schedule().unwrap();
    assert_eq!(schedule.stages, vec![vec![bottom], vec![left, right], vec![top]]);
}

#[test]
fn test_requires_chain_in_one_stage() {
    let mut graph = StageGraph::new();
    let nodes: Vec<NodeIndex> = (0..50)
        .map(|i| graph.add_node(EvalNode::new(format!("n{i}"))))
        .collect();
    // Each node requires the next one, so the order is reversed.
    for pair in nodes.windows(2) {
        graph.add_requires(pair[0], pair[1]);
    }

    let schedule = graph.schedule().unwrap();
    assert_eq!(schedule.stages.len(), 1);
    let order: Vec<NodeIndex> = schedule.order().collect();
    let reversed: Vec<NodeIndex> = nodes.iter().rev().copied().collect();
    assert_eq!(order, reversed);
}

#[test]
fn test_layered_graph_respects_every_edge() {
    // Ten layers of ten nodes. Every node is After one node of the previous
    // layer and Requires its right neighbour.
    let mut graph = StageGraph::new();
    let mut nodes = Vec::new();
    for layer in 0..10 {
        for column in 0..10 {
            nodes.push(graph.add_node(EvalNode::new(format!("n{layer}_{column}"))));
        }
    }
    for layer in 0..10 {
        for column in 0..10 {
            let node = nodes[layer * 10 + column];
            if layer > 0 {
                graph.add_after(node, nodes[(layer - 1) * 10 + (column * 7) % 10]);
            }
            if column < 9 {
                graph.add_requires(node, nodes[layer * 10 + column + 1]);
            }
        }
    }

    let schedule = graph.schedule().unwrap();
    assert_eq!(schedule.stages.len(), 10);
    assert_respects(&graph, &nodes, &schedule);
}

#[test]
fn test_long_after_chain() {
    let mut graph = StageGraph::new();
    let nodes: Vec<NodeIndex> = (0..500)
        .map(|i| graph.add_node(EvalNode::new(format!("n{i}"))))
        .collect();
    for pair in nodes.windows(2) {
        graph.add_after(pair[1], pair[0]);
    }

    let schedule = graph.schedule().unwrap();
    assert_eq!(schedule.stages.len(), 500);
    assert_respects(&graph, &nodes, &schedule);
}

#[test]
fn test_cycle_names_only_its_members() {
    // a -> b -> c -> a is a cycle; d only hangs off it.
    let mut graph = StageGraph::new();
    let a = graph.add_node(EvalNode::new("a"));
    let b = graph.add_node(EvalNode::new("b"));
    let c = graph.add_node(EvalNode::new("c"));
    let d = graph.add_node(EvalNode::new("d"));
    graph.add_requires(a, b);
    graph.add_requires(b, c);
    graph.add_requires(c, a);
    graph.add_requires(d, a);

    let error = graph.schedule().unwrap_err();
    assert!(error.is_cycle());
    assert_eq!(
        error,
        FatalError::RequiresCycle {
            names: vec!["a".into(), "b".into(), "c".into()]
        }
    );
}

// =============================================================================
// Module stages
// =============================================================================

#[test]
fn test_module_stages() {
    // const T: Type = Int
    // const y: T = 2
    // const x: Int = 1
    // fn f(): Int -> x
    let at = Span::point(1, 1);
    let constant = |name: &str, ty: &str, body: Expression| {
        TopLevelDeclaration::Constant(ConstantDeclaration {
            span: at,
            name: Name::new(name, at),
            ty: Expression::variable(ty, at),
            body: Block::expression(body),
        })
    };
    let module = Module {
        declarations: vec![
            constant("T", "Type", Expression::variable("Int", at)),
            constant("y", "T", Expression::int(2, at)),
            TopLevelDeclaration::Function(FunctionDeclaration {
                span: at,
                name: Name::new("f", at),
                parameters: Vec::new(),
                return_type: Expression::variable("Int", at),
                body: Block::expression(Expression::variable("x", at)),
            }),
            constant("x", "Int", Expression::int(1, at)),
        ],
    };
    let compiled = yune::compile(&module, &CompileOptions::default()).unwrap();

    let stage_of = |name: &str| {
        compiled
            .stages
            .iter()
            .position(|stage| stage.iter().any(|label| label == name))
            .unwrap()
    };
    // `y` is typed by `T`, so it is evaluated strictly after it. `f` only
    // requires `x`, so they share a stage with `x` ordered first.
    assert_eq!(stage_of("Type"), 0);
    assert_eq!(stage_of("T"), 1);
    assert_eq!(stage_of("y"), 2);
    assert_eq!(stage_of("x"), 1);
    assert_eq!(stage_of("f"), 1);
    let stage = &compiled.stages[1];
    let index = |name: &str| stage.iter().position(|label| label == name).unwrap();
    assert!(index("x") < index("f"));
    assert_eq!(compiled.type_of("y"), Some(&TypeValue::Int));
}
