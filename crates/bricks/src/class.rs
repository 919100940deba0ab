//! # Brick Classes
//!
//! A brick type declares its applications once, in [`Brick::define`]. The
//! runtime runs that declaration the first time it sees the type and keeps
//! the resulting [`BrickClass`]; every brick of the type shares it.
//!
//! ```rust,ignore
//! fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
//!     class
//!         .application("apply", &["x"], |linear, inv| linear.forward(&inv.input("x")?))?
//!         .inputs(["x"])?
//!         .outputs(["y"])?
//!         .property("dim", |linear| Ok(Attr::Int(linear.dim as i64)))?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::application::Application;
use crate::bound::BoundApplication;
use crate::brick::{short_type_name, Brick, BrickRef};
use crate::call::Invocation;
use crate::error::BrickError;
use crate::signature::Signature;
use crate::value::{Attr, Returns};

/// The applications shared by every brick of one type.
pub struct BrickClass {
    name: String,
    applications: Vec<Rc<Application>>,
}

impl BrickClass {
    /// Unqualified type name, e.g. `Linear`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn application(&self, name: &str) -> Option<&Rc<Application>> {
        self.applications.iter().find(|a| a.name() == name)
    }

    /// Applications in declaration order.
    pub fn applications(&self) -> &[Rc<Application>] {
        &self.applications
    }
}

impl fmt::Debug for BrickClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrickClass")
            .field("name", &self.name)
            .field(
                "applications",
                &self.applications.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Collects the application definitions of brick type `B`.
pub struct ClassBuilder<B> {
    name: &'static str,
    applications: Vec<Application>,
    _brick: PhantomData<fn(&B)>,
}

impl<B: Brick> ClassBuilder<B> {
    pub(crate) fn new() -> Self {
        Self {
            name: short_type_name::<B>(),
            applications: Vec::new(),
            _brick: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Declare an application with parameter names `params`.
    ///
    /// Naming a parameter `application` or `application_call` makes the
    /// bound application or the per-call context arrive at that position.
    pub fn application<F, R>(
        &mut self,
        name: &str,
        params: &[&str],
        function: F,
    ) -> Result<ApplicationBuilder<'_, B>, BrickError>
    where
        F: Fn(&B, &Invocation) -> Result<R, BrickError> + 'static,
        R: Into<Returns>,
    {
        if self.applications.iter().any(|a| a.name() == name) {
            return Err(BrickError::DuplicateApplication {
                class: self.name.to_string(),
                name: name.to_string(),
            });
        }
        let function = Rc::new(
            move |brick: &BrickRef, invocation: &Invocation| -> Result<Returns, BrickError> {
                brick
                    .with(|b: &B| function(b, invocation))?
                    .map(Into::into)
            },
        );
        self.applications.push(Application::new(
            name,
            self.name,
            Signature::new(params),
            function,
        ));
        let index = self.applications.len() - 1;
        Ok(ApplicationBuilder {
            application: &mut self.applications[index],
            _brick: PhantomData,
        })
    }

    pub(crate) fn finish(self) -> BrickClass {
        BrickClass {
            name: self.name.to_string(),
            applications: self.applications.into_iter().map(Rc::new).collect(),
        }
    }
}

/// Attaches metadata to an application being declared.
pub struct ApplicationBuilder<'a, B> {
    application: &'a mut Application,
    _brick: PhantomData<fn(&B)>,
}

impl<'a, B: Brick> ApplicationBuilder<'a, B> {
    /// Declared inputs; each must be a parameter or the varargs name.
    pub fn inputs<I, S>(self, names: I) -> Result<Self, BrickError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.application
            .set_inputs(names.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    /// Declared output names, used to name the returned variables.
    pub fn outputs<I, S>(self, names: I) -> Result<Self, BrickError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute("outputs", Attr::names(names))
    }

    /// Any static attribute.
    pub fn attribute(self, name: &str, value: Attr) -> Result<Self, BrickError> {
        self.application.set_attribute(name, value)?;
        Ok(self)
    }

    /// A read-only attribute computed from the brick on every lookup.
    pub fn property<G>(self, name: &str, getter: G) -> Result<Self, BrickError>
    where
        G: Fn(&B) -> Result<Attr, BrickError> + 'static,
    {
        let getter = Rc::new(move |brick: &BrickRef| -> Result<Attr, BrickError> {
            brick.with(|b: &B| getter(b))?
        });
        self.application.add_property(name, getter)?;
        Ok(self)
    }

    /// Where to look for attributes this application does not have.
    pub fn delegate<D>(self, resolver: D) -> Self
    where
        D: Fn(&B) -> Result<BoundApplication, BrickError> + 'static,
    {
        let resolver = Rc::new(
            move |brick: &BrickRef| -> Result<BoundApplication, BrickError> {
                brick.with(|b: &B| resolver(b))?
            },
        );
        self.application.set_delegate(resolver);
        self
    }
}
