//! # Annotations
//!
//! An annotation is a back-reference from a variable to an object that
//! claims it: the brick owning a parameter, the application call that
//! produced an output. [`Annotation`] is the shared bookkeeping such objects
//! embed to collect auxiliary variables (monitors, regularisers) and updates
//! that are not part of the main computation.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::roles::{add_role, Role};
use crate::variable::{Variable, WeakVariable};

/// Process-unique identity of an annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotatorId(u64);

impl AnnotatorId {
    /// Allocate a fresh identity.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that can be attached to a variable's tag.
pub trait Annotator: Any {
    fn annotator_id(&self) -> AnnotatorId;

    /// Human-readable label for debugging output.
    fn describe(&self) -> String;

    fn as_any(&self) -> &dyn Any;

    /// Owned `Any` view, for downcasting an [`AnnotationRef`].
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// Shared reference to an annotator, as stored on tags.
pub type AnnotationRef = Rc<dyn Annotator>;

/// Attach `annotator` to a variable. Attaching the same annotator twice is a
/// no-op.
pub fn add_annotation(variable: &Variable, annotator: AnnotationRef) {
    let id = annotator.annotator_id();
    variable.write(|node| {
        let annotations = &mut node.tag.annotations;
        if !annotations.iter().any(|a| a.annotator_id() == id) {
            annotations.push(annotator);
        }
    });
}

/// Bookkeeping for auxiliary variables and updates.
///
/// Variables are held weakly: an annotation lives on the tags of the very
/// graph it points into.
#[derive(Default)]
pub struct Annotation {
    auxiliary: RefCell<Vec<WeakVariable>>,
    updates: RefCell<Vec<(WeakVariable, WeakVariable)>>,
}

impl Annotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `variable` as an auxiliary variable of `owner`.
    ///
    /// The variable is annotated with `owner`, optionally renamed (display
    /// name and tag name), and tagged [`Role::Auxiliary`] plus `roles`.
    pub fn add_auxiliary_variable(
        &self,
        owner: AnnotationRef,
        variable: &Variable,
        roles: &[Role],
        name: Option<&str>,
    ) {
        add_annotation(variable, owner);
        if let Some(name) = name {
            variable.set_name(name);
            variable.set_tag_name(name);
        }
        add_role(variable, Role::Auxiliary);
        for role in roles {
            add_role(variable, *role);
        }
        self.auxiliary.borrow_mut().push(variable.downgrade());
    }

    /// Auxiliary variables whose graph is still alive, in insertion order.
    pub fn auxiliary_variables(&self) -> Vec<Variable> {
        self.auxiliary
            .borrow()
            .iter()
            .filter_map(WeakVariable::upgrade)
            .collect()
    }

    /// Record that `variable` should take the value of `value` after a step.
    pub fn add_update(&self, variable: &Variable, value: &Variable) {
        self.updates
            .borrow_mut()
            .push((variable.downgrade(), value.downgrade()));
    }

    pub fn updates(&self) -> Vec<(Variable, Variable)> {
        self.updates
            .borrow()
            .iter()
            .filter_map(|(v, u)| Some((v.upgrade()?, u.upgrade()?)))
            .collect()
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("auxiliary_variables", &self.auxiliary_variables())
            .field("updates", &self.updates.borrow().len())
            .finish()
    }
}
