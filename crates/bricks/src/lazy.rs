//! # Lazy Initialization
//!
//! With lazy initialization on (the default), a brick can be constructed
//! before all of its configuration is known: required constructor
//! arguments that were not supplied become [`Lazy::Unset`] and must be
//! filled in before allocation. With it off, the same construction fails
//! immediately with a missing-argument error.
//!
//! A constructor declares its parameters once as an [`InitSignature`] and
//! binds incoming [`InitArgs`] against it:
//!
//! ```rust
//! use brickwork_bricks::{InitArgs, InitSignature, Lazy, Runtime};
//!
//! let runtime = Runtime::new();
//! let signature = InitSignature::new()
//!     .required("input_dim")
//!     .required("output_dim")
//!     .optional("depth", 1usize);
//!
//! let mut args = signature.bind(&runtime, InitArgs::new().arg(5usize)).unwrap();
//! assert_eq!(args.take("input_dim"), Lazy::Set(5));
//! assert_eq!(args.take("output_dim"), Lazy::Unset);
//! assert_eq!(args.take("depth"), Lazy::Set(1));
//!
//! runtime.set_lazy(false);
//! assert!(signature.bind(&runtime, InitArgs::new().arg(5usize)).is_err());
//! ```

use crate::error::BrickError;
use crate::runtime::Runtime;

// ============================================================================
// Lazy values
// ============================================================================

/// A configuration value that may be supplied after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lazy<T> {
    Set(T),
    #[default]
    Unset,
}

impl<T> Lazy<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Lazy::Set(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Set(value) => Some(value),
            Lazy::Unset => None,
        }
    }

    pub fn set(&mut self, value: T) {
        *self = Lazy::Set(value);
    }

    /// The value, or a missing-configuration error naming `brick` and
    /// `name`.
    pub fn require(&self, brick: &str, name: &str) -> Result<&T, BrickError> {
        self.get().ok_or_else(|| BrickError::MissingConfiguration {
            brick: brick.to_string(),
            name: name.to_string(),
        })
    }

    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Lazy::Set(value),
            None => Lazy::Unset,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lazy::Set(value) => Some(value),
            Lazy::Unset => None,
        }
    }
}

impl<T> From<T> for Lazy<T> {
    fn from(value: T) -> Self {
        Lazy::Set(value)
    }
}

// ============================================================================
// Constructor signatures
// ============================================================================

#[derive(Debug, Clone)]
struct InitParam<V> {
    name: String,
    default: Option<V>,
}

/// Declared parameters of a brick constructor.
#[derive(Debug, Clone)]
pub struct InitSignature<V> {
    params: Vec<InitParam<V>>,
}

/// Arguments handed to a constructor, by position and by keyword.
#[derive(Debug, Clone)]
pub struct InitArgs<V> {
    positional: Vec<V>,
    keywords: Vec<(String, V)>,
}

/// Constructor arguments after binding: every declared parameter maps to a
/// value or, for unsupplied required parameters in lazy mode, to
/// [`Lazy::Unset`].
#[derive(Debug, Clone)]
pub struct LazyArgs<V> {
    values: Vec<(String, Lazy<V>)>,
}

impl<V> Default for InitSignature<V> {
    fn default() -> Self {
        Self { params: Vec::new() }
    }
}

impl<V> Default for InitArgs<V> {
    fn default() -> Self {
        Self {
            positional: Vec::new(),
            keywords: Vec::new(),
        }
    }
}

impl<V> InitArgs<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<V>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<V>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }
}

impl<V: Clone> InitSignature<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parameter without a default. Lazy mode may leave it unset.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(InitParam {
            name: name.into(),
            default: None,
        });
        self
    }

    /// A parameter with its own default; never left unset.
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<V>) -> Self {
        self.params.push(InitParam {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Match `args` against the declared parameters.
    ///
    /// Errors on surplus positionals, unknown keywords, a parameter given
    /// twice, and (only when lazy mode is off) a missing required parameter.
    pub fn bind(&self, runtime: &Runtime, args: InitArgs<V>) -> Result<LazyArgs<V>, BrickError> {
        let InitArgs {
            positional,
            mut keywords,
        } = args;

        if positional.len() > self.params.len() {
            return Err(BrickError::TooManyArguments {
                expected: self.params.len(),
                got: positional.len(),
            });
        }
        for (i, (name, _)) in keywords.iter().enumerate() {
            let position = self
                .params
                .iter()
                .position(|p| &p.name == name)
                .ok_or_else(|| BrickError::UnexpectedKeyword { name: name.clone() })?;
            let repeated = keywords[..i].iter().any(|(earlier, _)| earlier == name);
            if position < positional.len() || repeated {
                return Err(BrickError::DuplicateArgument { name: name.clone() });
            }
        }

        let lazy = runtime.is_lazy();
        let mut positional = positional.into_iter();
        let mut values = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let supplied = positional.next().or_else(|| {
                keywords
                    .iter()
                    .position(|(name, _)| name == &param.name)
                    .map(|i| keywords.swap_remove(i).1)
            });
            let value = match (supplied, &param.default) {
                (Some(value), _) => Lazy::Set(value),
                (None, Some(default)) => Lazy::Set(default.clone()),
                (None, None) if lazy => Lazy::Unset,
                (None, None) => {
                    return Err(BrickError::MissingArgument {
                        name: param.name.clone(),
                    })
                }
            };
            values.push((param.name.clone(), value));
        }
        Ok(LazyArgs { values })
    }
}

impl<V> LazyArgs<V> {
    pub fn get(&self, name: &str) -> Option<&Lazy<V>> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Move a bound value out; undeclared or already taken names are unset.
    pub fn take(&mut self, name: &str) -> Lazy<V> {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, value)) => std::mem::replace(value, Lazy::Unset),
            None => Lazy::Unset,
        }
    }
}
