//! # Variable Graph
//!
//! A graph is a program: variables (nodes) connected by the operations
//! that produce them (edges point from an operand to its result).
//! Bricks never look at numeric values; they only create nodes, copy them,
//! rename them and hang metadata off their tags.
//!
//! ## Key Concepts
//!
//! - **Node**: a variable record with an [`Op`], a [`Shape`], a display name
//!   and a [`VariableTag`]
//! - **Edge**: an operand feeding position `position` of its consumer
//! - **Graph**: a shared handle, cloned freely; every [`Variable`] keeps one

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::annotation::AnnotationRef;
use crate::error::CoreError;
use crate::roles::Role;
use crate::shape::Shape;
use crate::variable::Variable;

/// How a variable came to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// A free symbolic input.
    Input,
    /// Persistent storage, e.g. a parameter.
    Shared,
    /// Identity copy of its single operand.
    Copy,
    /// Result of a named operation on its operands.
    Apply(String),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Input => write!(f, "input"),
            Op::Shared => write!(f, "shared"),
            Op::Copy => write!(f, "copy"),
            Op::Apply(name) => write!(f, "{}", name),
        }
    }
}

/// Metadata attached to a variable by the layers above the graph.
#[derive(Clone, Default)]
pub struct VariableTag {
    /// Short name, e.g. `x` for a node displayed as `linear_apply_x`.
    pub name: Option<String>,
    /// Roles, most specific only (see [`crate::roles::add_role`]).
    pub roles: Vec<Role>,
    /// Objects that claim this variable (bricks, application calls).
    pub annotations: Vec<AnnotationRef>,
}

impl fmt::Debug for VariableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableTag")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field(
                "annotations",
                &self
                    .annotations
                    .iter()
                    .map(|a| a.describe())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A node in the graph.
#[derive(Debug, Clone)]
pub struct VarNode {
    pub op: Op,
    pub shape: Shape,
    pub name: Option<String>,
    pub tag: VariableTag,
}

impl VarNode {
    fn new(op: Op, shape: Shape, name: Option<String>) -> Self {
        Self {
            op,
            shape,
            name,
            tag: VariableTag::default(),
        }
    }
}

/// An operand edge: the source feeds input `position` of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub position: usize,
}

pub(crate) struct GraphInner {
    pub(crate) dag: DiGraph<VarNode, Edge>,
}

/// Shared handle to a variable graph.
///
/// Cloning is cheap and yields the same graph. The graph is single-threaded
/// (`Rc<RefCell<..>>`), matching the synchronous brick runtime.
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Rc<RefCell<GraphInner>>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner {
                dag: DiGraph::new(),
            })),
        }
    }

    fn add(&self, node: VarNode) -> Variable {
        let index = self.inner.borrow_mut().dag.add_node(node);
        Variable::from_parts(self.clone(), index)
    }

    /// Add a free symbolic input.
    pub fn input(&self, name: impl Into<String>, shape: Shape) -> Variable {
        self.add(VarNode::new(Op::Input, shape, Some(name.into())))
    }

    /// Add persistent storage (what bricks allocate for parameters).
    pub fn shared(&self, name: impl Into<String>, shape: Shape) -> Variable {
        self.add(VarNode::new(Op::Shared, shape, Some(name.into())))
    }

    /// Add the result of applying `op` to `inputs`.
    ///
    /// Returns an error if any operand lives in another graph.
    pub fn apply(
        &self,
        op: impl Into<String>,
        inputs: &[&Variable],
        shape: Shape,
    ) -> Result<Variable, CoreError> {
        for input in inputs {
            if !input.graph().same_as(self) {
                return Err(CoreError::ForeignVariable {
                    name: input.name().unwrap_or_default(),
                });
            }
        }
        let result = self.add(VarNode::new(Op::Apply(op.into()), shape, None));
        let mut inner = self.inner.borrow_mut();
        for (position, input) in inputs.iter().enumerate() {
            inner
                .dag
                .add_edge(input.index(), result.index(), Edge { position });
        }
        Ok(result)
    }

    /// Add a `Copy` node fed by `source`. Name and shape carry over, the
    /// tag starts empty.
    pub(crate) fn copy_of(&self, source: NodeIndex) -> Result<Variable, CoreError> {
        let node = {
            let inner = self.inner.borrow();
            let src = inner
                .dag
                .node_weight(source)
                .ok_or(CoreError::UnknownVariable {
                    index: source.index(),
                })?;
            VarNode::new(Op::Copy, src.shape.clone(), src.name.clone())
        };
        let copy = self.add(node);
        self.inner
            .borrow_mut()
            .dag
            .add_edge(source, copy.index(), Edge { position: 0 });
        Ok(copy)
    }

    /// Operands of `node`, ordered by input position.
    pub(crate) fn operands(&self, node: NodeIndex) -> Vec<Variable> {
        let inner = self.inner.borrow();
        let mut edges: Vec<_> = inner
            .dag
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.weight().position, e.source()))
            .collect();
        edges.sort_by_key(|(position, _)| *position);
        edges
            .into_iter()
            .map(|(_, source)| Variable::from_parts(self.clone(), source))
            .collect()
    }

    /// Every variable in insertion order.
    pub fn variables(&self) -> Vec<Variable> {
        let indices: Vec<NodeIndex> = self.inner.borrow().dag.node_indices().collect();
        indices
            .into_iter()
            .map(|i| Variable::from_parts(self.clone(), i))
            .collect()
    }

    /// Variables carrying `role` (or a role that specialises it).
    pub fn variables_with_role(&self, role: Role) -> Vec<Variable> {
        self.variables()
            .into_iter()
            .filter(|v| v.has_role(role))
            .collect()
    }

    /// Every variable the given outputs depend on, outputs included,
    /// in insertion order.
    pub fn ancestors(&self, outputs: &[Variable]) -> Vec<Variable> {
        let inner = self.inner.borrow();
        let reversed = Reversed(&inner.dag);
        let mut seen = vec![false; inner.dag.node_count()];
        for output in outputs.iter().filter(|o| o.graph().same_as(self)) {
            let mut dfs = Dfs::new(reversed, output.index());
            while let Some(node) = dfs.next(reversed) {
                seen[node.index()] = true;
            }
        }
        inner
            .dag
            .node_indices()
            .filter(|i| seen[i.index()])
            .map(|i| Variable::from_parts(self.clone(), i))
            .collect()
    }

    /// Number of variables in the graph.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().dag.node_count()
    }

    /// Number of operand edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.inner.borrow().dag.edge_count()
    }

    /// Whether two handles point at the same graph.
    pub fn same_as(&self, other: &Graph) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<GraphInner>> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph({} variables, {} edges)",
            self.node_count(),
            self.edge_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_graph() {
        let graph = Graph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_apply_wires_operands_in_order() {
        let graph = Graph::new();
        let x = graph.input("x", Shape::f32_batch(3));
        let w = graph.shared("W", Shape::f32_matrix(3, 2));
        let y = graph
            .apply("dot", &[&x, &w], Shape::f32_batch(2))
            .expect("same graph");

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(y.inputs(), vec![x, w]);
        assert_eq!(y.op(), Op::Apply("dot".to_string()));
    }

    #[test]
    fn test_apply_rejects_foreign_variable() {
        let graph = Graph::new();
        let other = Graph::new();
        let x = other.input("x", Shape::f32_scalar());

        let result = graph.apply("neg", &[&x], Shape::f32_scalar());
        assert!(matches!(result, Err(CoreError::ForeignVariable { .. })));
    }

    #[test]
    fn test_ancestors_skip_unrelated_nodes() {
        let graph = Graph::new();
        let x = graph.input("x", Shape::f32_scalar());
        let unrelated = graph.input("z", Shape::f32_scalar());
        let y = graph.apply("neg", &[&x], Shape::f32_scalar()).unwrap();

        let ancestors = graph.ancestors(&[y.clone()]);
        assert_eq!(ancestors, vec![x, y]);
        assert!(!ancestors.contains(&unrelated));
    }
}
