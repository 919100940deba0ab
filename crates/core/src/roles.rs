//! # Roles
//!
//! Roles tell later tooling what a variable *is*: an input of some brick,
//! one of its outputs, a parameter. They form a small hierarchy so that a
//! weight is also found when asking for parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::variable::Variable;

/// Tag describing the part a variable plays in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Input,
    Output,
    Parameter,
    /// A parameter multiplying its input.
    Weight,
    /// A parameter added to its input.
    Bias,
    /// Side product of an application (monitors, regularisers).
    Auxiliary,
}

impl Role {
    /// The role this one specialises, if any.
    pub fn parent(&self) -> Option<Role> {
        match self {
            Role::Weight | Role::Bias => Some(Role::Parameter),
            _ => None,
        }
    }

    /// Whether `self` is `other` or a specialisation of it.
    pub fn is_a(&self, other: Role) -> bool {
        let mut current = Some(*self);
        while let Some(role) = current {
            if role == other {
                return true;
            }
            current = role.parent();
        }
        false
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Input => "INPUT",
            Role::Output => "OUTPUT",
            Role::Parameter => "PARAMETER",
            Role::Weight => "WEIGHT",
            Role::Bias => "BIAS",
            Role::Auxiliary => "AUXILIARY",
        };
        write!(f, "{}", name)
    }
}

/// Attach `role` to a variable.
///
/// Roles that `role` specialises are replaced by it. If the variable already
/// carries something at least as specific, nothing changes.
pub fn add_role(variable: &Variable, role: Role) {
    variable.write(|node| {
        let roles = &mut node.tag.roles;
        roles.retain(|old| !role.is_a(*old));
        if !roles.iter().any(|old| old.is_a(role)) {
            roles.push(role);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::shape::Shape;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Weight.is_a(Role::Parameter));
        assert!(Role::Bias.is_a(Role::Parameter));
        assert!(!Role::Parameter.is_a(Role::Weight));
        assert!(!Role::Input.is_a(Role::Output));
    }

    #[test]
    fn test_add_role_is_idempotent() {
        let graph = Graph::new();
        let v = graph.input("v", Shape::f32_scalar());
        add_role(&v, Role::Input);
        add_role(&v, Role::Input);
        assert_eq!(v.roles(), vec![Role::Input]);
    }

    #[test]
    fn test_specific_role_replaces_general() {
        let graph = Graph::new();
        let w = graph.shared("W", Shape::f32_matrix(2, 2));
        add_role(&w, Role::Parameter);
        add_role(&w, Role::Weight);
        assert_eq!(w.roles(), vec![Role::Weight]);

        // Asking for the general role again keeps the specific one.
        add_role(&w, Role::Parameter);
        assert_eq!(w.roles(), vec![Role::Weight]);
        assert!(w.has_role(Role::Parameter));
    }

    #[test]
    fn test_unrelated_roles_accumulate() {
        let graph = Graph::new();
        let v = graph.input("v", Shape::f32_scalar());
        add_role(&v, Role::Output);
        add_role(&v, Role::Auxiliary);
        assert_eq!(v.roles(), vec![Role::Output, Role::Auxiliary]);
    }
}
