//! # Application Calls
//!
//! Each call of an application creates a fresh [`ApplicationCall`]. Every
//! tagged input and output is annotated with it, and the function can ask
//! for it (by declaring an `application_call` parameter) to attach
//! auxiliary variables such as monitors or regularisers that are not part
//! of the main computation.
//!
//! The function itself sees its arguments through an [`Invocation`].

use brickwork_core::{Annotation, Annotator, AnnotatorId, Role, Variable};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::bound::BoundApplication;
use crate::brick::{BrickRef, BrickTag};
use crate::error::BrickError;
use crate::signature::{Signature, APPLICATION_CALL_PARAM, APPLICATION_PARAM};
use crate::value::Value;

/// Display name of a variable tagged by an application:
/// `<brick>_<application>_<name>`.
pub(crate) fn variable_name(brick: &str, application: &str, name: &str) -> String {
    format!("{}_{}_{}", brick, application, name)
}

// ============================================================================
// Call context
// ============================================================================

/// Context of one application call.
pub struct ApplicationCall {
    id: AnnotatorId,
    brick: Rc<BrickTag>,
    application: BoundApplication,
    annotation: Annotation,
}

impl ApplicationCall {
    pub(crate) fn new(brick: &BrickRef, application: BoundApplication) -> Self {
        Self {
            id: AnnotatorId::fresh(),
            brick: brick.tag().clone(),
            application,
            annotation: Annotation::new(),
        }
    }

    pub fn id(&self) -> AnnotatorId {
        self.id
    }

    /// The brick whose application is called.
    pub fn brick(&self) -> &Rc<BrickTag> {
        &self.brick
    }

    pub fn application(&self) -> &BoundApplication {
        &self.application
    }

    /// Attach a variable produced during this call.
    ///
    /// With a `name`, the variable is renamed
    /// `<brick>_<application>_<name>` and its tag name set to `name`.
    pub fn add_auxiliary_variable(
        self: &Rc<Self>,
        variable: &Variable,
        roles: &[Role],
        name: Option<&str>,
    ) {
        if let Some(name) = name {
            variable.set_name(variable_name(
                self.brick.name(),
                self.application.name(),
                name,
            ));
            variable.set_tag_name(name);
        }
        self.annotation
            .add_auxiliary_variable(self.clone(), variable, roles, None);
    }

    pub fn auxiliary_variables(&self) -> Vec<Variable> {
        self.annotation.auxiliary_variables()
    }

    pub fn add_update(&self, variable: &Variable, value: &Variable) {
        self.annotation.add_update(variable, value);
    }

    pub fn updates(&self) -> Vec<(Variable, Variable)> {
        self.annotation.updates()
    }
}

impl Annotator for ApplicationCall {
    fn annotator_id(&self) -> AnnotatorId {
        self.id
    }

    fn describe(&self) -> String {
        format!("call of {}.{}", self.brick.name(), self.application.name())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl fmt::Debug for ApplicationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationCall")
            .field("id", &self.id)
            .field("application", &self.application)
            .field("annotation", &self.annotation)
            .finish()
    }
}

// ============================================================================
// Arguments as seen by the function
// ============================================================================

/// Arguments of one call, after injection and input tagging.
pub struct Invocation {
    brick: BrickRef,
    application: BoundApplication,
    signature: Signature,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Invocation {
    pub(crate) fn new(
        brick: BrickRef,
        application: BoundApplication,
        signature: Signature,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Self {
        Self {
            brick,
            application,
            signature,
            positional,
            keywords,
        }
    }

    /// The brick being applied, as a shared handle.
    pub fn brick(&self) -> &BrickRef {
        &self.brick
    }

    pub fn application_name(&self) -> &str {
        self.application.name()
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }

    /// The argument for parameter `name`, by position or by keyword.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let by_position = self
            .signature
            .position(name)
            .and_then(|i| self.positional.get(i));
        by_position.or_else(|| {
            self.keywords
                .iter()
                .find(|(keyword, _)| keyword == name)
                .map(|(_, value)| value)
        })
    }

    /// Positionals beyond the declared parameters.
    pub fn varargs(&self) -> &[Value] {
        let declared = self.signature.params().len().min(self.positional.len());
        &self.positional[declared..]
    }

    fn missing(&self, name: &str) -> BrickError {
        BrickError::MissingInput {
            application: self.application.name().to_string(),
            name: name.to_string(),
        }
    }

    /// The argument for `name`, failing if it was not supplied.
    pub fn input(&self, name: &str) -> Result<Variable, BrickError> {
        self.get(name)
            .ok_or_else(|| self.missing(name))?
            .clone()
            .into_variable()
    }

    /// Like [`Invocation::input`], but an absent argument is `None`.
    pub fn variable(&self, name: &str) -> Result<Option<Variable>, BrickError> {
        match self.get(name) {
            None | Some(Value::None) => Ok(None),
            Some(value) => value.clone().into_variable().map(Some),
        }
    }

    /// The call context, for functions declaring `application_call`.
    pub fn application_call(&self) -> Result<Rc<ApplicationCall>, BrickError> {
        match self.get(APPLICATION_CALL_PARAM) {
            Some(Value::Call(call)) => Ok(call.clone()),
            _ => Err(self.missing(APPLICATION_CALL_PARAM)),
        }
    }

    /// The bound application, for functions declaring `application`.
    pub fn bound_application(&self) -> Result<BoundApplication, BrickError> {
        match self.get(APPLICATION_PARAM) {
            Some(Value::Application(application)) => Ok(application.clone()),
            _ => Err(self.missing(APPLICATION_PARAM)),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("application", &self.application)
            .field("positional", &self.positional)
            .field("keywords", &self.keywords)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert_eq!(variable_name("foo", "apply", "x"), "foo_apply_x");
    }
}
