//! # Brickwork Core - Variable Graph Foundations
//!
//! This crate provides the symbolic substrate that bricks annotate:
//!
//! - **Graph**: a directed graph of variables wired by operations
//! - **Variables**: opaque node handles with a name, a tag, and `copy()`
//! - **Shapes**: element types plus fixed or symbolic dimensions
//! - **Roles**: what a variable is (input, output, parameter, ...)
//! - **Annotations**: back-references from variables to the objects that
//!   claim them
//!
//! Nothing here evaluates numbers. A brick library only needs to create
//! nodes, copy them, rename them, and attach metadata for later filtering.
//!
//! ```rust
//! use brickwork_core::{add_role, Graph, Role, Shape};
//!
//! let graph = Graph::new();
//! let x = graph.input("x", Shape::f32_batch(3));
//! let copy = x.copy().unwrap();
//! copy.set_name("linear_apply_x");
//! add_role(&copy, Role::Input);
//!
//! assert_eq!(graph.variables_with_role(Role::Input), vec![copy]);
//! ```

pub mod annotation;
pub mod error;
pub mod graph;
pub mod roles;
pub mod shape;
pub mod variable;

// Re-export key types at crate root for convenience
pub use annotation::{add_annotation, Annotation, AnnotationRef, Annotator, AnnotatorId};
pub use error::CoreError;
pub use graph::{Edge, Graph, Op, VarNode, VariableTag};
pub use roles::{add_role, Role};
pub use shape::{DType, Dim, Shape};
pub use variable::{Variable, WeakVariable};
