//! # Bound Applications
//!
//! A [`BoundApplication`] pairs one [`Application`] with one brick. It holds
//! no state of its own beyond that pair, and references both weakly: a
//! bound application never keeps its brick alive.
//!
//! ## Attribute lookup
//!
//! `name` always answers with the application name. Anything else is
//! resolved in [`Lookup::ORDER`]:
//!
//! 1. **Property**: a getter registered on the application, called with the
//!    brick
//! 2. **Definition**: a static attribute of the application (`inputs`,
//!    `outputs`, ...)
//! 3. **Delegate**: the same lookup on the bound application the delegate
//!    resolver returns
//!
//! ```rust,ignore
//! let apply = brick.application("apply")?;
//! let outputs = apply.outputs()?;      // ["y"]
//! let dim = apply.get("dim")?;         // property, computed from the brick
//! let y = apply.call(&x)?.into_variable()?;
//! ```

use std::fmt;
use std::rc::{Rc, Weak};

use crate::application::{Application, INPUTS, NAME, OUTPUTS};
use crate::brick::{BrickRef, WeakBrickRef};
use crate::error::BrickError;
use crate::value::{Args, Attr, Outputs};

struct BoundInner {
    name: String,
    application: Weak<Application>,
    brick: WeakBrickRef,
    brick_name: String,
}

/// An application bound to a brick. Cloning yields the same view.
#[derive(Clone)]
pub struct BoundApplication {
    inner: Rc<BoundInner>,
}

/// One step of attribute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Property,
    Definition,
    Delegate,
}

impl Lookup {
    pub const ORDER: [Lookup; 3] = [Lookup::Property, Lookup::Definition, Lookup::Delegate];

    fn resolve(
        self,
        application: &Application,
        brick: &BrickRef,
        name: &str,
    ) -> Result<Option<Attr>, BrickError> {
        match self {
            Lookup::Property => match application.property(name) {
                Some(getter) => getter(brick).map(Some),
                None => Ok(None),
            },
            Lookup::Definition => Ok(application.attribute(name)),
            Lookup::Delegate => {
                let Some(resolver) = application.delegate() else {
                    return Ok(None);
                };
                match resolver(brick)?.get(name) {
                    Ok(attr) => Ok(Some(attr)),
                    Err(BrickError::AttributeNotFound { .. }) => Ok(None),
                    Err(err) => Err(err),
                }
            }
        }
    }
}

impl BoundApplication {
    pub(crate) fn new(application: &Rc<Application>, brick: &BrickRef) -> Self {
        Self {
            inner: Rc::new(BoundInner {
                name: application.name().to_string(),
                application: Rc::downgrade(application),
                brick: brick.downgrade(),
                brick_name: brick.name().to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the brick this application was bound to, even once dropped.
    pub fn brick_name(&self) -> &str {
        &self.inner.brick_name
    }

    fn dropped(&self) -> BrickError {
        BrickError::BrickDropped {
            application: format!("{}.{}", self.inner.brick_name, self.inner.name),
        }
    }

    pub fn brick(&self) -> Result<BrickRef, BrickError> {
        self.inner.brick.upgrade().ok_or_else(|| self.dropped())
    }

    pub fn application(&self) -> Result<Rc<Application>, BrickError> {
        self.inner.application.upgrade().ok_or_else(|| self.dropped())
    }

    pub fn is_alive(&self) -> bool {
        self.inner.brick.is_alive()
    }

    pub fn ptr_eq(&self, other: &BoundApplication) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve an attribute through properties, the definition and the
    /// delegate, in that order.
    pub fn get(&self, name: &str) -> Result<Attr, BrickError> {
        if name == NAME {
            return Ok(Attr::Text(self.name().to_string()));
        }
        let application = self.application()?;
        let brick = self.brick()?;
        for step in Lookup::ORDER {
            if let Some(attr) = step.resolve(&application, &brick, name)? {
                return Ok(attr);
            }
        }
        Err(BrickError::AttributeNotFound {
            application: self.name().to_string(),
            name: name.to_string(),
        })
    }

    pub fn inputs(&self) -> Result<Vec<String>, BrickError> {
        self.get(INPUTS)?.into_names()
    }

    pub fn outputs(&self) -> Result<Vec<String>, BrickError> {
        self.get(OUTPUTS)?.into_names()
    }

    /// Apply the application to `args`.
    pub fn call(&self, args: impl Into<Args>) -> Result<Outputs, BrickError> {
        self.application()?.apply(self, args.into())
    }
}

impl fmt::Debug for BoundApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundApplication({}.{})", self.inner.brick_name, self.inner.name)
    }
}

impl PartialEq for BoundApplication {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
