//! Serializable snapshots of brick trees.
//!
//! ```rust,ignore
//! let summary = BrickSummary::of(&mlp)?;
//! println!("{}", summary.to_json()?);
//! ```

use brickwork_core::{Role, Shape};
use serde::{Deserialize, Serialize};

use crate::brick::BrickRef;
use crate::error::BrickError;

/// One parameter of a brick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub name: Option<String>,
    pub shape: Shape,
    /// Element count, unknown while any axis is symbolic.
    pub size: Option<usize>,
    pub roles: Vec<Role>,
}

/// A brick, its lifecycle state, and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickSummary {
    pub name: String,
    pub class: String,
    pub allocated: bool,
    pub initialized: bool,
    pub applications: Vec<String>,
    pub parameters: Vec<ParameterSummary>,
    pub children: Vec<BrickSummary>,
}

impl BrickSummary {
    pub fn of(brick: &BrickRef) -> Result<Self, BrickError> {
        let parameters = brick
            .params()?
            .iter()
            .map(|param| ParameterSummary {
                name: param.name(),
                shape: param.shape(),
                size: param.shape().numel(),
                roles: param.roles(),
            })
            .collect();
        let children = brick
            .children()?
            .iter()
            .map(BrickSummary::of)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name: brick.name().to_string(),
            class: brick.class().name().to_string(),
            allocated: brick.is_allocated(),
            initialized: brick.is_initialized(),
            applications: brick
                .class()
                .applications()
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
            parameters,
            children,
        })
    }

    /// Parameters in this brick and all its descendants.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
            + self
                .children
                .iter()
                .map(BrickSummary::parameter_count)
                .sum::<usize>()
    }

    /// Total elements in this subtree's parameters, or `None` if any
    /// parameter has a symbolic axis.
    pub fn parameter_size(&self) -> Option<usize> {
        let own = self
            .parameters
            .iter()
            .map(|param| param.size)
            .sum::<Option<usize>>()?;
        self.children
            .iter()
            .map(BrickSummary::parameter_size)
            .sum::<Option<usize>>()
            .map(|below| own + below)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
