//! # Brickwork - Lazily Allocated, Annotated Bricks
//!
//! This crate builds neural-network components ("bricks") on top of the
//! symbolic variable graph of `brickwork-core`:
//!
//! - **Bricks**: components owning children and parameters, with a
//!   push-config / allocate / initialize lifecycle
//! - **Applications**: class-level operations bound per brick, with static
//!   attributes, read-only properties and delegation
//! - **Calls**: every application call copies and tags its inputs and
//!   outputs with roles, names and annotations
//! - **Runtime**: the lazy flag, the call stack enforcing parent/child
//!   discipline, and the brick class registry
//! - **Lazy configuration**: constructor arguments that may be supplied
//!   after construction
//!
//! ## Design Philosophy
//!
//! Everything is explicit: a brick type registers its applications in
//! [`Brick::define`], a bound application is produced by
//! [`Application::bind`], and attribute lookup is an ordered chain
//! ([`Lookup::ORDER`]). All shared state lives on a [`Runtime`], so two
//! runtimes never see each other's call stacks or settings.
//!
//! ```rust
//! use brickwork_bricks::{Brick, BrickCore, BrickError, BrickRef, ClassBuilder, Runtime};
//! use brickwork_core::{Role, Shape};
//!
//! struct Double {
//!     core: BrickCore,
//! }
//!
//! impl Brick for Double {
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
//!             .application("apply", &["x"], |brick, inv| {
//!                 let x = inv.input("x")?;
//!                 let graph = brick.core().runtime().graph();
//!                 Ok(graph.apply("double", &[&x], x.shape())?)
//!             })?
//!             .outputs(["y"])?;
//!         Ok(())
//!     }
//! }
//!
//! let runtime = Runtime::new();
//! let double = BrickRef::new(Double {
//!     core: BrickCore::new::<Double>(&runtime, None),
//! })
//! .unwrap();
//!
//! let x = runtime.graph().input("x", Shape::f32_batch(3));
//! let y = double.apply("apply", &x).unwrap().into_variable().unwrap();
//!
//! assert_eq!(y.name().as_deref(), Some("double_apply_y"));
//! assert!(y.has_role(Role::Output));
//! assert!(double.is_allocated());
//! ```

pub mod application;
pub mod bound;
pub mod brick;
pub mod call;
pub mod class;
pub mod error;
pub mod filter;
pub mod lazy;
pub mod parameters;
pub mod runtime;
pub mod signature;
pub mod summary;
pub mod value;

// Re-export key types at crate root for convenience
pub use application::{Application, INPUTS, NAME, OUTPUTS};
pub use bound::{BoundApplication, Lookup};
pub use brick::{AsAny, Brick, BrickCore, BrickRef, BrickTag, WeakBrickRef};
pub use call::{ApplicationCall, Invocation};
pub use class::{ApplicationBuilder, BrickClass, ClassBuilder};
pub use error::{BrickError, Stage};
pub use filter::{get_application_call, get_brick, VariableFilter};
pub use lazy::{InitArgs, InitSignature, Lazy, LazyArgs};
pub use parameters::Parameters;
pub use runtime::{Runtime, RuntimeConfig, LAZY_ENV, PRINT_SHAPES_ENV};
pub use signature::{Signature, APPLICATION_CALL_PARAM, APPLICATION_PARAM};
pub use summary::{BrickSummary, ParameterSummary};
pub use value::{Args, Attr, Outputs, Returns, Value, RETURN_DICT, RETURN_LIST};

// The graph layer every brick annotates
pub use brickwork_core;
