//! # Error Types
//!
//! Every failure in the brick layer is synchronous and reported to the
//! caller. The variants fall into four kinds:
//!
//! - **Configuration**: the brick or application was declared or called
//!   inconsistently (conflicting return modes, unknown inputs, ...)
//! - **Lifecycle**: an application was reached from the wrong place in the
//!   call stack, or a brick was busy or gone
//! - **Lazy configuration**: an allocation or initialization hook failed
//!   while lazy mode was on, so some configuration was probably never set
//! - **Missing data**: a name that nothing knows about

use brickwork_core::CoreError;
use std::fmt;
use thiserror::Error;

/// Lifecycle stage whose hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Allocation,
    Initialization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Allocation => write!(f, "allocation"),
            Stage::Initialization => write!(f, "initialization"),
        }
    }
}

/// Errors raised by bricks, applications and the runtime.
#[derive(Debug, Error, Clone)]
pub enum BrickError {
    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------
    /// `return_dict` and `return_list` were both requested.
    #[error("return_dict and return_list are mutually exclusive")]
    ConflictingReturnMode,

    /// A return-mode flag was given a non-boolean value.
    #[error("{flag} must be a boolean")]
    InvalidReturnFlag { flag: String },

    /// Property names must be non-empty identifiers.
    #[error("Invalid property name {name:?}")]
    InvalidPropertyName { name: String },

    /// Assignment to an attribute backed by a property.
    #[error("Can't set attribute {name} of application {application}: it is a read-only property")]
    ReadOnlyAttribute { application: String, name: String },

    /// Declared inputs that are not parameters of the application.
    #[error("Unexpected inputs {inputs:?} for application {application}")]
    UnexpectedInputs {
        application: String,
        inputs: Vec<String>,
    },

    /// More outputs than declared names, or a dict-mode count mismatch.
    #[error("Unexpected outputs: application {application} declares {declared} outputs but returned {returned}")]
    UnexpectedOutputs {
        application: String,
        declared: usize,
        returned: usize,
    },

    /// The same argument was supplied by position and by keyword.
    #[error("Argument {name} given both positionally and by keyword")]
    DuplicateArgument { name: String },

    /// A keyword argument that names no declared parameter.
    #[error("Unexpected keyword argument {name}")]
    UnexpectedKeyword { name: String },

    /// More positional arguments than declared parameters.
    #[error("Expected at most {expected} positional arguments, got {got}")]
    TooManyArguments { expected: usize, got: usize },

    /// A required constructor argument was missing while lazy mode is off.
    #[error("Missing required argument {name}")]
    MissingArgument { name: String },

    /// Two applications with one name in the same brick class.
    #[error("Brick class {class} already defines an application named {name}")]
    DuplicateApplication { class: String, name: String },

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------
    /// An application was invoked by something other than its parent.
    #[error("Brick {brick} cannot be applied from {caller}: it is neither the caller nor one of its children")]
    NotAChild { brick: String, caller: String },

    /// A brick was already borrowed, typically a re-entrant lifecycle call.
    #[error("Brick {brick} is busy and cannot be borrowed {access}")]
    BrickBusy { brick: String, access: &'static str },

    /// A bound application outlived its brick.
    #[error("The brick bound to application {application} has been dropped")]
    BrickDropped { application: String },

    /// A typed view requested the wrong concrete brick type.
    #[error("Brick {brick} is not a {expected}")]
    WrongBrickType { brick: String, expected: &'static str },

    // ------------------------------------------------------------------
    // Lazy configuration
    // ------------------------------------------------------------------
    /// A hook failed while lazy initialization was enabled.
    #[error("Lazy initialization is enabled, so please make sure you have set all the required configuration for this method call ({stage} of {brick} failed: {source})")]
    LazyConfiguration {
        brick: String,
        stage: Stage,
        #[source]
        source: Box<BrickError>,
    },

    /// A lazily supplied configuration value is still unset.
    #[error("Configuration {name} of brick {brick} is not set")]
    MissingConfiguration { brick: String, name: String },

    // ------------------------------------------------------------------
    // Missing data
    // ------------------------------------------------------------------
    /// Base bricks know no dimensions.
    #[error("No dimension information for {name} available")]
    NoDimension { name: String },

    /// Attribute lookup fell through properties, definition and delegate.
    #[error("Application {application} has no attribute {name}")]
    AttributeNotFound { application: String, name: String },

    /// No application by that name on the brick's class.
    #[error("Brick {brick} has no application named {name}")]
    UnknownApplication { brick: String, name: String },

    /// An argument the application function asked for was not supplied.
    #[error("Application {application} received no argument {name}")]
    MissingInput { application: String, name: String },

    /// An index past the end of a parameter list.
    #[error("Index {index} out of bounds for {len} parameters")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A value of the wrong kind where a specific one was expected.
    #[error("Expected {expected}, got {got}")]
    TypeMismatch { expected: &'static str, got: String },

    // ------------------------------------------------------------------
    // Other
    // ------------------------------------------------------------------
    /// Failure raised by the variable graph.
    #[error(transparent)]
    Graph(#[from] CoreError),

    /// Failure raised by a concrete brick's own hook.
    #[error("{message}")]
    Hook { message: String },
}

impl BrickError {
    /// Failure raised by brick-specific code.
    pub fn hook(message: impl Into<String>) -> Self {
        BrickError::Hook {
            message: message.into(),
        }
    }

    /// Whether this is a lazy-configuration failure.
    pub fn is_lazy_configuration(&self) -> bool {
        matches!(self, BrickError::LazyConfiguration { .. })
    }
}
