//! # Variables
//!
//! A [`Variable`] is an opaque handle onto one node of a [`Graph`]. It has a
//! mutable display name, a mutable [`VariableTag`], and can be copied into a
//! fresh node computing the same value. Everything above this crate treats
//! it as nothing more than that.

use petgraph::graph::NodeIndex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use crate::annotation::AnnotationRef;
use crate::error::CoreError;
use crate::graph::{Graph, GraphInner, Op, VarNode, VariableTag};
use crate::roles::Role;
use crate::shape::Shape;

/// Handle onto a graph node.
///
/// Two handles are equal when they point at the same node of the same graph.
#[derive(Clone)]
pub struct Variable {
    graph: Graph,
    index: NodeIndex,
}

impl Variable {
    pub(crate) fn from_parts(graph: Graph, index: NodeIndex) -> Self {
        Self { graph, index }
    }

    fn read<R>(&self, f: impl FnOnce(&VarNode) -> R) -> R {
        let inner = self.graph.inner.borrow();
        f(&inner.dag[self.index])
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut VarNode) -> R) -> R {
        let mut inner = self.graph.inner.borrow_mut();
        f(&mut inner.dag[self.index])
    }

    /// Node index inside the owning graph.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// The graph this variable lives in.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<String> {
        self.read(|n| n.name.clone())
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.write(|n| n.name = Some(name));
    }

    /// Short tag name, e.g. `x` for `linear_apply_x`.
    pub fn tag_name(&self) -> Option<String> {
        self.read(|n| n.tag.name.clone())
    }

    pub fn set_tag_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.write(|n| n.tag.name = Some(name));
    }

    /// Snapshot of the tag.
    pub fn tag(&self) -> VariableTag {
        self.read(|n| n.tag.clone())
    }

    pub fn roles(&self) -> Vec<Role> {
        self.read(|n| n.tag.roles.clone())
    }

    /// Whether this variable carries `role` or a specialisation of it.
    pub fn has_role(&self, role: Role) -> bool {
        self.read(|n| n.tag.roles.iter().any(|r| r.is_a(role)))
    }

    pub fn annotations(&self) -> Vec<AnnotationRef> {
        self.read(|n| n.tag.annotations.clone())
    }

    pub fn shape(&self) -> Shape {
        self.read(|n| n.shape.clone())
    }

    pub fn op(&self) -> Op {
        self.read(|n| n.op.clone())
    }

    /// Operands that produced this variable, in input order.
    pub fn inputs(&self) -> Vec<Variable> {
        self.graph.operands(self.index)
    }

    /// A new node computing the same value, with the same name and shape
    /// and an empty tag.
    pub fn copy(&self) -> Result<Variable, CoreError> {
        self.graph.copy_of(self.index)
    }

    /// Non-owning handle, used where holding the graph would form a cycle.
    pub fn downgrade(&self) -> WeakVariable {
        WeakVariable {
            graph: self.graph.downgrade(),
            index: self.index,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.graph.same_as(&other.graph) && self.index == other.index
    }
}

impl Eq for Variable {}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Variable({})", name),
            None => write!(f, "Variable(#{})", self.index.index()),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "<{}>", self.op()),
        }
    }
}

/// A [`Variable`] that does not keep its graph alive.
#[derive(Clone)]
pub struct WeakVariable {
    graph: Weak<RefCell<GraphInner>>,
    index: NodeIndex,
}

impl WeakVariable {
    /// The variable, if its graph still exists.
    pub fn upgrade(&self) -> Option<Variable> {
        self.graph
            .upgrade()
            .map(|inner| Variable::from_parts(Graph { inner }, self.index))
    }
}

impl fmt::Debug for WeakVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(v) => write!(f, "WeakVariable({:?})", v),
            None => write!(f, "WeakVariable(<dropped>)"),
        }
    }
}
