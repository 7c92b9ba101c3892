//! Staged scheduling of evaluation nodes.
//!
//! Nodes are related by two constraints:
//!
//! - **After**: the dependency must be placed in a strictly earlier stage.
//! - **Requires**: the dependency must be placed in the same or an earlier
//!   stage, and before the node within a stage.
//!
//! [`StageGraph::schedule`] places nodes stage by stage. Each round queues
//! every node whose After-dependencies are already placed, checks that the
//! queued nodes only require nodes that are placed or queued, then sorts the
//! round by its Requires-dependencies. Each of the three steps has its own
//! failure, reported as [`FatalError::AfterCycle`],
//! [`FatalError::MixedCycle`] and [`FatalError::RequiresCycle`].

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use yune_core::FatalError;

use crate::declaration::DeclId;

// ============================================================================
// Types
// ============================================================================

/// A schedulable unit of evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalNode {
    /// Name used in cycle diagnostics.
    pub label: String,
    /// The top-level declaration evaluated by this node, if any.
    pub declaration: Option<DeclId>,
    /// The value is already known. The node still constrains others but is
    /// skipped when the schedule is executed.
    pub is_precomputed: bool,
}

impl EvalNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            declaration: None,
            is_precomputed: false,
        }
    }

    pub fn for_declaration(label: impl Into<String>, declaration: DeclId) -> Self {
        Self {
            declaration: Some(declaration),
            ..Self::new(label)
        }
    }

    pub fn precomputed(mut self) -> Self {
        self.is_precomputed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    After,
    Requires,
}

/// Stages in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub stages: Vec<Vec<NodeIndex>>,
}

impl Schedule {
    /// All nodes in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.stages.iter().flatten().copied()
    }
}

// ============================================================================
// StageGraph
// ============================================================================

/// Evaluation nodes with edges pointing from a dependency to its dependent.
#[derive(Debug, Default)]
pub struct StageGraph {
    graph: DiGraph<EvalNode, Constraint>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: EvalNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// `node` must be placed in a later stage than `dependency`.
    pub fn add_after(&mut self, node: NodeIndex, dependency: NodeIndex) {
        self.graph.add_edge(dependency, node, Constraint::After);
    }

    /// `node` must be placed no earlier than `dependency`.
    pub fn add_requires(&mut self, node: NodeIndex, dependency: NodeIndex) {
        self.graph.add_edge(dependency, node, Constraint::Requires);
    }

    pub fn node(&self, index: NodeIndex) -> &EvalNode {
        &self.graph[index]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Dependencies of `node` under one constraint.
    pub fn dependencies(
        &self,
        node: NodeIndex,
        constraint: Constraint,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .filter(move |edge| *edge.weight() == constraint)
            .map(|edge| edge.source())
    }

    /// Compute a staged evaluation order.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn schedule(&self) -> Result<Schedule, FatalError> {
        let after = self.dependency_sets(Constraint::After);
        let requires = self.dependency_sets(Constraint::Requires);

        let mut evaluated: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut unevaluated: Vec<NodeIndex> = self.graph.node_indices().collect();
        let mut schedule = Schedule::default();

        while !unevaluated.is_empty() {
            // Frontier: every After-dependency already placed.
            let (queued, rest): (Vec<NodeIndex>, Vec<NodeIndex>) = unevaluated
                .iter()
                .partition(|node| after[node.index()].is_subset(&evaluated));
            if queued.is_empty() {
                return Err(FatalError::AfterCycle {
                    names: self.cycle_members(&rest, Constraint::After),
                });
            }

            // Requires may only point at placed or queued nodes.
            let accessible: FxHashSet<NodeIndex> =
                evaluated.iter().chain(queued.iter()).copied().collect();
            for node in &queued {
                let mut missing: Vec<NodeIndex> = requires[node.index()]
                    .difference(&accessible)
                    .copied()
                    .collect();
                if !missing.is_empty() {
                    missing.sort();
                    return Err(FatalError::MixedCycle {
                        name: self.graph[*node].label.clone(),
                        missing: missing
                            .into_iter()
                            .map(|n| self.graph[n].label.clone())
                            .collect(),
                    });
                }
            }

            // Order the frontier by Requires.
            let mut visible = evaluated.clone();
            let mut stage = Vec::with_capacity(queued.len());
            let mut pending = queued;
            while !pending.is_empty() {
                let before = pending.len();
                pending.retain(|node| {
                    if requires[node.index()].is_subset(&visible) {
                        visible.insert(*node);
                        stage.push(*node);
                        false
                    } else {
                        true
                    }
                });
                if pending.len() == before {
                    return Err(FatalError::RequiresCycle {
                        names: self.cycle_members(&pending, Constraint::Requires),
                    });
                }
            }

            tracing::debug!(
                stage = schedule.stages.len(),
                nodes = stage.len(),
                "scheduled stage"
            );
            evaluated.extend(stage.iter().copied());
            schedule.stages.push(stage);
            unevaluated = rest;
        }

        Ok(schedule)
    }

    fn dependency_sets(&self, constraint: Constraint) -> Vec<FxHashSet<NodeIndex>> {
        self.graph
            .node_indices()
            .map(|node| self.dependencies(node, constraint).collect())
            .collect()
    }

    /// Labels of the nodes among `nodes` that lie on a cycle of
    /// `constraint` edges, falling back to all of `nodes`.
    fn cycle_members(&self, nodes: &[NodeIndex], constraint: Constraint) -> Vec<String> {
        let mut subgraph: DiGraph<NodeIndex, ()> = DiGraph::new();
        let mut local: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        for node in nodes {
            local.insert(*node, subgraph.add_node(*node));
        }
        for node in nodes {
            for dependency in self.dependencies(*node, constraint) {
                if let Some(source) = local.get(&dependency) {
                    subgraph.add_edge(*source, local[node], ());
                }
            }
        }

        let mut members: Vec<NodeIndex> = tarjan_scc(&subgraph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| subgraph.contains_edge(*n, *n))
            })
            .flatten()
            .map(|n| subgraph[n])
            .collect();
        if members.is_empty() {
            members = nodes.to_vec();
        }
        members.sort();
        members
            .into_iter()
            .map(|n| self.graph[n].label.clone())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
