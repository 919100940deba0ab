//! # Variable Filters
//!
//! Applications leave a trail on every variable they tag: a role, the
//! brick, the call, and a short tag name. Tooling (monitoring, weight
//! decay, parameter selection) picks variables out of a graph by that
//! trail.
//!
//! ```rust,ignore
//! let weights = VariableFilter::new()
//!     .roles([Role::Weight])
//!     .brick(&encoder)
//!     .apply(&graph.variables());
//! ```

use brickwork_core::{AnnotatorId, Role, Shape, Variable};
use std::rc::Rc;

use crate::brick::{BrickRef, BrickTag};
use crate::call::ApplicationCall;

/// The first application call annotating `variable`.
pub fn get_application_call(variable: &Variable) -> Option<Rc<ApplicationCall>> {
    variable
        .annotations()
        .into_iter()
        .find_map(|annotation| annotation.into_any().downcast::<ApplicationCall>().ok())
}

/// The first brick annotating `variable`.
pub fn get_brick(variable: &Variable) -> Option<Rc<BrickTag>> {
    variable
        .annotations()
        .into_iter()
        .find_map(|annotation| annotation.into_any().downcast::<BrickTag>().ok())
}

/// Selects variables by role, brick, application, tag name and shape.
/// Empty criteria match everything; set criteria must all match.
#[derive(Debug, Clone, Default)]
pub struct VariableFilter {
    roles: Vec<Role>,
    bricks: Vec<AnnotatorId>,
    application: Option<String>,
    name: Option<String>,
    shape: Option<Shape>,
}

impl VariableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep variables carrying any of `roles` (or a specialisation).
    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Keep variables annotated with `brick`. Repeat for several bricks.
    pub fn brick(mut self, brick: &BrickRef) -> Self {
        self.bricks.push(brick.id());
        self
    }

    /// Keep variables tagged by a call of the named application.
    pub fn application(mut self, name: impl Into<String>) -> Self {
        self.application = Some(name.into());
        self
    }

    /// Keep variables whose tag name is `name`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keep variables whose shape is compatible with `shape`. Symbolic
    /// axes on either side match any size.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn matches(&self, variable: &Variable) -> bool {
        if !self.roles.is_empty() && !self.roles.iter().any(|r| variable.has_role(*r)) {
            return false;
        }
        if !self.bricks.is_empty()
            && !variable
                .annotations()
                .iter()
                .any(|a| self.bricks.contains(&a.annotator_id()))
        {
            return false;
        }
        if let Some(application) = &self.application {
            match get_application_call(variable) {
                Some(call) if call.application().name() == application => {}
                _ => return false,
            }
        }
        if let Some(name) = &self.name {
            if variable.tag_name().as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(shape) = &self.shape {
            if !variable.shape().is_compatible(shape) {
                return false;
            }
        }
        true
    }

    /// Matching variables, in input order.
    pub fn apply(&self, variables: &[Variable]) -> Vec<Variable> {
        variables
            .iter()
            .filter(|v| self.matches(v))
            .cloned()
            .collect()
    }
}
