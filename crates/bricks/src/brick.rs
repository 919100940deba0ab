//! # Bricks
//!
//! A brick owns parameters and children and goes through three stages:
//!
//! 1. **Construction**: the concrete type builds its [`BrickCore`] (name,
//!    children) and is wrapped in a shared [`BrickRef`]
//! 2. **Allocation**: configuration is pushed down to the children, the
//!    children allocate, then the brick rebuilds its own parameter list
//! 3. **Initialization**: after allocation, children initialize first and
//!    the brick initializes its own parameters last
//!
//! Applying any application allocates the brick if needed, and in eager
//! mode also initializes it.
//!
//! ## Lifecycle flags
//!
//! ```text
//! initialized            => allocated
//! allocated              => allocation_config_pushed
//! initialized            => initialization_config_pushed
//! ```
//!
//! Flags only ever go back to false when a child rejects a configuration
//! push; a failed hook leaves the brick as it was mid-way.
//!
//! ## Defining a brick
//!
//! ```rust
//! use brickwork_bricks::{Brick, BrickCore, BrickError, BrickRef, ClassBuilder, Runtime};
//!
//! struct Identity {
//!     core: BrickCore,
//! }
//!
//! impl Brick for Identity {
//!     fn core(&self) -> &BrickCore {
//!         &self.core
//!     }
//!
//!     fn core_mut(&mut self) -> &mut BrickCore {
//!         &mut self.core
//!     }
//!
//!     fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
//!         class
//!             .application("apply", &["x"], |_, inv| inv.input("x"))?
//!             .outputs(["y"])?;
//!         Ok(())
//!     }
//! }
//!
//! let runtime = Runtime::new();
//! let brick = BrickRef::new(Identity {
//!     core: BrickCore::new::<Identity>(&runtime, None),
//! })
//! .unwrap();
//! assert_eq!(brick.name(), "identity");
//! assert!(!brick.is_allocated());
//! ```

use brickwork_core::{Annotation, Annotator, AnnotatorId, Role, Variable};
use std::any::{type_name, Any};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::bound::BoundApplication;
use crate::class::{BrickClass, ClassBuilder};
use crate::error::{BrickError, Stage};
use crate::parameters::Parameters;
use crate::runtime::Runtime;
use crate::value::{Args, Outputs};

// ============================================================================
// Brick trait
// ============================================================================

/// `Any` access for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A component with parameters, children and applications.
///
/// Implementors embed a [`BrickCore`] and override the hooks they need.
/// The hooks are never called directly: [`BrickRef`] runs them as part of
/// the lifecycle.
pub trait Brick: AsAny {
    fn core(&self) -> &BrickCore;

    fn core_mut(&mut self) -> &mut BrickCore;

    /// Declare the applications of this brick type. Runs once per type and
    /// runtime.
    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError>
    where
        Self: Sized,
    {
        let _ = class;
        Ok(())
    }

    /// Configure children before allocation.
    fn do_push_allocation_config(&mut self) -> Result<(), BrickError> {
        Ok(())
    }

    /// Configure children before initialization.
    fn do_push_initialization_config(&mut self) -> Result<(), BrickError> {
        Ok(())
    }

    /// Create parameters. The parameter list is empty when this runs.
    fn do_allocate(&mut self) -> Result<(), BrickError> {
        Ok(())
    }

    /// Set initial parameter values.
    fn do_initialize(&mut self) -> Result<(), BrickError> {
        Ok(())
    }

    /// Dimension of a named input or output.
    fn get_dim(&self, name: &str) -> Result<usize, BrickError> {
        Err(BrickError::NoDimension {
            name: name.to_string(),
        })
    }

    /// [`Brick::get_dim`] for several names at once.
    fn get_dims(&self, names: &[&str]) -> Result<BTreeMap<String, usize>, BrickError> {
        names
            .iter()
            .map(|name| Ok((name.to_string(), self.get_dim(name)?)))
            .collect()
    }
}

/// Short, unqualified name of a type, without generic arguments.
pub(crate) fn short_type_name<B: ?Sized>() -> &'static str {
    let full = type_name::<B>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ============================================================================
// Identity
// ============================================================================

/// Identity of a brick as seen from the variables it annotates.
///
/// Holds no reference to the brick itself, so tags never keep a brick
/// alive. Like a brick, it collects auxiliary variables.
pub struct BrickTag {
    id: AnnotatorId,
    name: String,
    class: String,
    annotation: Annotation,
}

impl BrickTag {
    pub(crate) fn new(name: String, class: String) -> Self {
        Self {
            id: AnnotatorId::fresh(),
            name,
            class,
            annotation: Annotation::new(),
        }
    }

    pub fn id(&self) -> AnnotatorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }
}

impl Annotator for BrickTag {
    fn annotator_id(&self) -> AnnotatorId {
        self.id
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.class)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl fmt::Debug for BrickTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrickTag")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("class", &self.class)
            .finish()
    }
}

// ============================================================================
// Core state
// ============================================================================

/// State every brick embeds: identity, runtime, children and parameters.
pub struct BrickCore {
    tag: Rc<BrickTag>,
    runtime: Runtime,
    children: Vec<BrickRef>,
    params: Parameters,
}

impl BrickCore {
    /// Core for brick type `B`; the name defaults to the lowercased type
    /// name.
    pub fn new<B: Brick>(runtime: &Runtime, name: Option<&str>) -> Self {
        let class = short_type_name::<B>();
        let name = match name {
            Some(name) => name.to_string(),
            None => class.to_lowercase(),
        };
        let tag = Rc::new(BrickTag::new(name, class.to_string()));
        Self {
            params: Parameters::new(tag.clone()),
            tag,
            runtime: runtime.clone(),
            children: Vec::new(),
        }
    }

    /// Builder-style [`BrickCore::add_child`].
    pub fn with_children(mut self, children: impl IntoIterator<Item = BrickRef>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        self.tag.name()
    }

    pub fn tag(&self) -> &Rc<BrickTag> {
        &self.tag
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn children(&self) -> &[BrickRef] {
        &self.children
    }

    pub fn add_child(&mut self, child: BrickRef) {
        self.children.push(child);
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }
}

impl fmt::Debug for BrickCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrickCore")
            .field("name", &self.name())
            .field("children", &self.children)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Default)]
struct Flags {
    allocated: Cell<bool>,
    initialized: Cell<bool>,
    allocation_config_pushed: Cell<bool>,
    initialization_config_pushed: Cell<bool>,
}

struct BrickNode<B: ?Sized> {
    tag: Rc<BrickTag>,
    class: Rc<BrickClass>,
    runtime: Runtime,
    flags: Flags,
    brick: RefCell<B>,
}

// ============================================================================
// Shared handle
// ============================================================================

/// Shared handle to a brick. Cloning yields the same brick.
#[derive(Clone)]
pub struct BrickRef {
    node: Rc<BrickNode<dyn Brick>>,
}

impl BrickRef {
    /// Wrap a brick, defining its class on the brick's runtime if this is
    /// the first brick of its type.
    pub fn new<B: Brick>(brick: B) -> Result<Self, BrickError> {
        let runtime = brick.core().runtime().clone();
        let tag = brick.core().tag().clone();
        let class = runtime.class_of::<B>()?;
        let node: Rc<BrickNode<dyn Brick>> = Rc::new(BrickNode {
            tag,
            class,
            runtime,
            flags: Flags::default(),
            brick: RefCell::new(brick),
        });
        Ok(Self { node })
    }

    pub fn id(&self) -> AnnotatorId {
        self.node.tag.id()
    }

    pub fn name(&self) -> &str {
        self.node.tag.name()
    }

    pub fn tag(&self) -> &Rc<BrickTag> {
        &self.node.tag
    }

    pub fn class(&self) -> &Rc<BrickClass> {
        &self.node.class
    }

    pub fn runtime(&self) -> &Runtime {
        &self.node.runtime
    }

    pub fn ptr_eq(&self, other: &BrickRef) -> bool {
        self.id() == other.id()
    }

    pub fn downgrade(&self) -> WeakBrickRef {
        WeakBrickRef {
            node: Rc::downgrade(&self.node),
        }
    }

    fn borrow(&self) -> Result<Ref<'_, dyn Brick>, BrickError> {
        self.node.brick.try_borrow().map_err(|_| BrickError::BrickBusy {
            brick: self.name().to_string(),
            access: "for reading",
        })
    }

    fn borrow_mut(&self) -> Result<RefMut<'_, dyn Brick>, BrickError> {
        self.node
            .brick
            .try_borrow_mut()
            .map_err(|_| BrickError::BrickBusy {
                brick: self.name().to_string(),
                access: "for writing",
            })
    }

    /// Run `f` on the concrete brick.
    pub fn with<B: Brick, R>(&self, f: impl FnOnce(&B) -> R) -> Result<R, BrickError> {
        let guard = self.borrow()?;
        let brick = (*guard)
            .as_any()
            .downcast_ref::<B>()
            .ok_or_else(|| BrickError::WrongBrickType {
                brick: self.name().to_string(),
                expected: short_type_name::<B>(),
            })?;
        Ok(f(brick))
    }

    /// Run `f` on the concrete brick, mutably.
    pub fn with_mut<B: Brick, R>(&self, f: impl FnOnce(&mut B) -> R) -> Result<R, BrickError> {
        let mut guard = self.borrow_mut()?;
        let brick = (*guard)
            .as_any_mut()
            .downcast_mut::<B>()
            .ok_or_else(|| BrickError::WrongBrickType {
                brick: self.name().to_string(),
                expected: short_type_name::<B>(),
            })?;
        Ok(f(brick))
    }

    /// Run `f` on the embedded core, whatever the brick type.
    pub fn with_core<R>(&self, f: impl FnOnce(&BrickCore) -> R) -> Result<R, BrickError> {
        let guard = self.borrow()?;
        Ok(f(guard.core()))
    }

    pub fn children(&self) -> Result<Vec<BrickRef>, BrickError> {
        self.with_core(|core| core.children().to_vec())
    }

    pub fn has_child(&self, child: &BrickRef) -> Result<bool, BrickError> {
        self.with_core(|core| core.children().iter().any(|c| c.ptr_eq(child)))
    }

    /// Current parameters, skipping empty slots.
    pub fn params(&self) -> Result<Vec<Variable>, BrickError> {
        self.with_core(|core| core.params().variables())
    }

    pub fn get_dim(&self, name: &str) -> Result<usize, BrickError> {
        self.borrow()?.get_dim(name)
    }

    pub fn get_dims(&self, names: &[&str]) -> Result<BTreeMap<String, usize>, BrickError> {
        self.borrow()?.get_dims(names)
    }

    // ------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------

    /// The named application bound to this brick. Repeated calls return the
    /// same bound application.
    pub fn application(&self, name: &str) -> Result<BoundApplication, BrickError> {
        let application =
            self.node
                .class
                .application(name)
                .ok_or_else(|| BrickError::UnknownApplication {
                    brick: self.name().to_string(),
                    name: name.to_string(),
                })?;
        Ok(application.bind(self))
    }

    /// Shorthand for `self.application(name)?.call(args)`.
    pub fn apply(&self, name: &str, args: impl Into<Args>) -> Result<Outputs, BrickError> {
        self.application(name)?.call(args)
    }

    /// Register an auxiliary variable on the brick itself.
    pub fn add_auxiliary_variable(&self, variable: &Variable, roles: &[Role], name: Option<&str>) {
        let tag = self.node.tag.clone();
        tag.annotation()
            .add_auxiliary_variable(tag.clone(), variable, roles, name);
    }

    pub fn auxiliary_variables(&self) -> Vec<Variable> {
        self.node.tag.annotation().auxiliary_variables()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn is_allocated(&self) -> bool {
        self.node.flags.allocated.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.node.flags.initialized.get()
    }

    pub fn is_allocation_config_pushed(&self) -> bool {
        self.node.flags.allocation_config_pushed.get()
    }

    pub fn is_initialization_config_pushed(&self) -> bool {
        self.node.flags.initialization_config_pushed.get()
    }

    /// Push allocation configuration to this brick and its subtree.
    ///
    /// If a child fails, this brick's pushed flag is cleared again before
    /// the error propagates. Children that already succeeded keep theirs.
    pub fn push_allocation_config(&self) -> Result<(), BrickError> {
        debug!(brick = self.name(), "push allocation config");
        self.borrow_mut()?.do_push_allocation_config()?;
        let pushed = &self.node.flags.allocation_config_pushed;
        pushed.set(true);
        for child in self.children()? {
            if let Err(err) = child.push_allocation_config() {
                pushed.set(false);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Push initialization configuration to this brick and its subtree.
    pub fn push_initialization_config(&self) -> Result<(), BrickError> {
        debug!(brick = self.name(), "push initialization config");
        self.borrow_mut()?.do_push_initialization_config()?;
        let pushed = &self.node.flags.initialization_config_pushed;
        pushed.set(true);
        for child in self.children()? {
            if let Err(err) = child.push_initialization_config() {
                pushed.set(false);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Allocate the children, then rebuild this brick's parameter list.
    pub fn allocate(&self) -> Result<(), BrickError> {
        if !self.is_allocation_config_pushed() {
            self.push_allocation_config()?;
        }
        for child in self.children()? {
            child.allocate()?;
        }
        debug!(brick = self.name(), "allocate");
        self.run_hook(Stage::Allocation, |brick| {
            brick.core_mut().params_mut().clear();
            brick.do_allocate()
        })?;
        self.node.flags.allocated.set(true);
        Ok(())
    }

    /// Initialize the children, then this brick. Allocates first if needed.
    pub fn initialize(&self) -> Result<(), BrickError> {
        if !self.is_allocated() {
            self.allocate()?;
        }
        if !self.is_initialization_config_pushed() {
            self.push_initialization_config()?;
        }
        for child in self.children()? {
            child.initialize()?;
        }
        debug!(brick = self.name(), "initialize");
        self.run_hook(Stage::Initialization, |brick| brick.do_initialize())?;
        self.node.flags.initialized.set(true);
        Ok(())
    }

    /// Run an allocation or initialization hook. In lazy mode a failure is
    /// reported as a lazy-configuration error carrying the original cause.
    fn run_hook(
        &self,
        stage: Stage,
        hook: impl FnOnce(&mut dyn Brick) -> Result<(), BrickError>,
    ) -> Result<(), BrickError> {
        let result = {
            let mut brick = self.borrow_mut()?;
            hook(&mut *brick)
        };
        result.map_err(|err| {
            if !self.node.runtime.is_lazy() {
                return err;
            }
            warn!(
                brick = self.name(),
                %stage,
                error = %err,
                "hook failed with lazy initialization enabled"
            );
            BrickError::LazyConfiguration {
                brick: self.name().to_string(),
                stage,
                source: Box::new(err),
            }
        })
    }
}

impl fmt::Debug for BrickRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BrickRef({})", self.name())
    }
}

impl PartialEq for BrickRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BrickRef {}

/// A [`BrickRef`] that does not keep the brick alive.
#[derive(Clone)]
pub struct WeakBrickRef {
    node: Weak<BrickNode<dyn Brick>>,
}

impl WeakBrickRef {
    pub fn upgrade(&self) -> Option<BrickRef> {
        self.node.upgrade().map(|node| BrickRef { node })
    }

    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }
}

impl fmt::Debug for WeakBrickRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(brick) => write!(f, "WeakBrickRef({})", brick.name()),
            None => write!(f, "WeakBrickRef(<dropped>)"),
        }
    }
}
