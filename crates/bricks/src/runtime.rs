//! # Runtime Context
//!
//! Everything that would otherwise be process-wide mutable state lives on a
//! [`Runtime`]: the lazy flag, the call stack of currently executing bricks,
//! the registry of brick classes, and the default variable graph. Bricks
//! hold a handle to the runtime they were built with; tests build a fresh
//! runtime each and never share state.
//!
//! ## Call stack
//!
//! Every application call pushes its brick on entry and pops it when the
//! returned [`CallGuard`] drops, on success and failure alike. A brick may
//! only be pushed on top of itself or of its parent:
//!
//! ```text
//! []            -> mlp.apply      ok (top level)
//! [mlp]         -> linear.apply   ok (linear is a child of mlp)
//! [mlp, linear] -> other.apply    NotAChild
//! ```

use brickwork_core::Graph;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

use crate::brick::{Brick, BrickRef};
use crate::class::{BrickClass, ClassBuilder};
use crate::error::BrickError;

/// Environment variable overriding [`RuntimeConfig::lazy`].
pub const LAZY_ENV: &str = "BRICKWORK_LAZY";
/// Environment variable overriding [`RuntimeConfig::print_shapes`].
pub const PRINT_SHAPES_ENV: &str = "BRICKWORK_PRINT_SHAPES";

// ============================================================================
// Configuration
// ============================================================================

/// Runtime switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Defer required configuration until allocation.
    pub lazy: bool,
    /// Log the name and shape of every tagged input and output.
    pub print_shapes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lazy: true,
            print_shapes: false,
        }
    }
}

impl RuntimeConfig {
    /// Set lazy initialization.
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Set shape logging.
    pub fn with_print_shapes(mut self, print_shapes: bool) -> Self {
        self.print_shapes = print_shapes;
        self
    }

    /// Defaults overridden by `BRICKWORK_LAZY` and `BRICKWORK_PRINT_SHAPES`.
    ///
    /// `1`, `true`, `yes` and `on` (any case) switch a flag on; any other
    /// non-empty value switches it off; unset or empty keeps the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lazy: env_flag(LAZY_ENV).unwrap_or(defaults.lazy),
            print_shapes: env_flag(PRINT_SHAPES_ENV).unwrap_or(defaults.print_shapes),
        }
    }

    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn env_flag(key: &str) -> Option<bool> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(parse_bool(&value)),
        _ => None,
    }
}

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

// ============================================================================
// Runtime
// ============================================================================

struct RuntimeState {
    config: RefCell<RuntimeConfig>,
    call_stack: RefCell<Vec<BrickRef>>,
    classes: RefCell<HashMap<TypeId, Rc<BrickClass>>>,
    graph: Graph,
}

/// Shared brick runtime. Cloning yields the same runtime.
#[derive(Clone)]
pub struct Runtime {
    state: Rc<RuntimeState>,
}

impl Runtime {
    /// A runtime with the default configuration (lazy on).
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            state: Rc::new(RuntimeState {
                config: RefCell::new(config),
                call_stack: RefCell::new(Vec::new()),
                classes: RefCell::new(HashMap::new()),
                graph: Graph::new(),
            }),
        }
    }

    pub fn config(&self) -> RuntimeConfig {
        *self.state.config.borrow()
    }

    pub fn is_lazy(&self) -> bool {
        self.state.config.borrow().lazy
    }

    pub fn set_lazy(&self, lazy: bool) {
        self.state.config.borrow_mut().lazy = lazy;
    }

    pub fn print_shapes(&self) -> bool {
        self.state.config.borrow().print_shapes
    }

    pub fn set_print_shapes(&self, print_shapes: bool) {
        self.state.config.borrow_mut().print_shapes = print_shapes;
    }

    /// The graph bricks create their parameters in.
    pub fn graph(&self) -> &Graph {
        &self.state.graph
    }

    /// Names of the bricks currently applying, outermost first.
    pub fn call_stack(&self) -> Vec<String> {
        self.state
            .call_stack
            .borrow()
            .iter()
            .map(|b| b.name().to_string())
            .collect()
    }

    pub fn call_depth(&self) -> usize {
        self.state.call_stack.borrow().len()
    }

    /// The class of brick type `B`, defining it on first use.
    pub(crate) fn class_of<B: Brick>(&self) -> Result<Rc<BrickClass>, BrickError> {
        let key = TypeId::of::<B>();
        if let Some(class) = self.state.classes.borrow().get(&key) {
            return Ok(class.clone());
        }
        let mut builder = ClassBuilder::<B>::new();
        B::define(&mut builder)?;
        let class = Rc::new(builder.finish());
        let mut classes = self.state.classes.borrow_mut();
        Ok(classes.entry(key).or_insert(class).clone())
    }

    /// Push `brick` on the call stack.
    ///
    /// The stack top, if any, must be `brick` itself or have it as a child.
    pub(crate) fn enter(&self, brick: &BrickRef) -> Result<CallGuard, BrickError> {
        let mut stack = self.state.call_stack.borrow_mut();
        if let Some(top) = stack.last() {
            if !top.ptr_eq(brick) && !top.has_child(brick)? {
                return Err(BrickError::NotAChild {
                    brick: brick.name().to_string(),
                    caller: top.name().to_string(),
                });
            }
        }
        stack.push(brick.clone());
        trace!(brick = brick.name(), depth = stack.len(), "enter application");
        Ok(CallGuard {
            runtime: self.clone(),
        })
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config())
            .field("call_stack", &self.call_stack())
            .field("classes", &self.state.classes.borrow().len())
            .finish()
    }
}

/// Pops the call stack when dropped.
#[must_use]
pub(crate) struct CallGuard {
    runtime: Runtime,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        let mut stack = self.runtime.state.call_stack.borrow_mut();
        if let Some(brick) = stack.pop() {
            trace!(brick = brick.name(), depth = stack.len(), "exit application");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_setters() {
        let config = RuntimeConfig::default();
        assert!(config.lazy);
        assert!(!config.print_shapes);

        let config = config.with_lazy(false).with_print_shapes(true);
        assert!(!config.lazy);
        assert!(config.print_shapes);
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = RuntimeConfig::from_json(r#"{"print_shapes": true}"#).unwrap();
        assert!(config.lazy);
        assert!(config.print_shapes);
        assert!(RuntimeConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_bool() {
        for on in ["1", "true", "YES", " on "] {
            assert!(parse_bool(on), "{on}");
        }
        for off in ["0", "false", "nope"] {
            assert!(!parse_bool(off), "{off}");
        }
    }

    // The only test touching these variables, so it owns them.
    #[test]
    fn test_config_from_env() {
        std::env::remove_var(LAZY_ENV);
        std::env::remove_var(PRINT_SHAPES_ENV);
        assert_eq!(RuntimeConfig::from_env(), RuntimeConfig::default());

        std::env::set_var(LAZY_ENV, "");
        std::env::set_var(PRINT_SHAPES_ENV, "  ");
        assert_eq!(RuntimeConfig::from_env(), RuntimeConfig::default());

        std::env::set_var(LAZY_ENV, "0");
        std::env::set_var(PRINT_SHAPES_ENV, "on");
        let config = RuntimeConfig::from_env();
        assert!(!config.lazy);
        assert!(config.print_shapes);

        std::env::remove_var(LAZY_ENV);
        std::env::remove_var(PRINT_SHAPES_ENV);
    }

    #[test]
    fn test_runtime_flags_are_per_instance() {
        let a = Runtime::new();
        let b = Runtime::new();
        a.set_lazy(false);
        assert!(!a.is_lazy());
        assert!(b.is_lazy());
        assert!(a.clone().ptr_eq(&a));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.call_depth(), 0);
    }
}
