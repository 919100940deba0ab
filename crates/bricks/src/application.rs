//! # Applications
//!
//! An [`Application`] is the class-level definition of one operation of a
//! brick type: the function itself, its declared parameters, static
//! attributes such as `outputs`, read-only properties computed from the
//! brick, and an optional delegate for attributes it lacks. It is frozen
//! once its class is registered.
//!
//! Binding an application to a brick yields a [`BoundApplication`],
//! memoized per brick so that repeated lookups return the same view.
//!
//! ## Calling
//!
//! Every call goes through [`Application::apply`]:
//!
//! 1. `return_dict` / `return_list` are taken out of the keywords
//! 2. The bound application and the call context are injected where the
//!    function declares `application` / `application_call`
//! 3. The brick is allocated, and initialized too when lazy mode is off
//! 4. The brick is pushed on the runtime call stack
//! 5. Variable arguments are replaced by tagged `INPUT` copies
//! 6. The function runs, then the stack is popped
//! 7. Variable results are replaced by tagged `OUTPUT` copies
//! 8. The results are shaped into a single value, a sequence or a mapping

use brickwork_core::{add_annotation, add_role, AnnotatorId, Role, Variable};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use tracing::info;

use crate::bound::BoundApplication;
use crate::brick::BrickRef;
use crate::call::{variable_name, ApplicationCall, Invocation};
use crate::error::BrickError;
use crate::signature::{Signature, APPLICATION_CALL_PARAM, APPLICATION_PARAM};
use crate::value::{take_flag, Args, Attr, Outputs, Returns, Value, RETURN_DICT, RETURN_LIST};

/// Attribute holding the declared output names.
pub const OUTPUTS: &str = "outputs";
/// Attribute holding the declared input names.
pub const INPUTS: &str = "inputs";
/// Attribute holding the application name.
pub const NAME: &str = "name";

pub(crate) type ApplyFn = Rc<dyn Fn(&BrickRef, &Invocation) -> Result<Returns, BrickError>>;
pub(crate) type PropertyFn = Rc<dyn Fn(&BrickRef) -> Result<Attr, BrickError>>;
pub(crate) type DelegateFn = Rc<dyn Fn(&BrickRef) -> Result<BoundApplication, BrickError>>;

/// Class-level definition of one brick operation.
pub struct Application {
    name: String,
    class: String,
    signature: Signature,
    function: ApplyFn,
    inputs: Option<Vec<String>>,
    attributes: BTreeMap<String, Attr>,
    properties: BTreeMap<String, PropertyFn>,
    delegate: Option<DelegateFn>,
    bound: RefCell<HashMap<AnnotatorId, BoundApplication>>,
}

impl Application {
    pub(crate) fn new(name: &str, class: &str, signature: Signature, function: ApplyFn) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            signature,
            function,
            inputs: None,
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            delegate: None,
            bound: RefCell::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the brick class declaring this application.
    pub fn class_name(&self) -> &str {
        &self.class
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn inputs(&self) -> Option<&[String]> {
        self.inputs.as_deref()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// A statically known attribute: `name`, declared `inputs`, or anything
    /// set with [`crate::ApplicationBuilder::attribute`].
    pub fn attribute(&self, name: &str) -> Option<Attr> {
        match name {
            NAME => Some(Attr::Text(self.name.clone())),
            INPUTS => self.inputs.clone().map(Attr::Names),
            _ => self.attributes.get(name).cloned(),
        }
    }

    pub(crate) fn property(&self, name: &str) -> Option<&PropertyFn> {
        self.properties.get(name)
    }

    pub(crate) fn delegate(&self) -> Option<&DelegateFn> {
        self.delegate.as_ref()
    }

    // ------------------------------------------------------------------
    // Definition
    // ------------------------------------------------------------------

    pub(crate) fn set_inputs(&mut self, inputs: Vec<String>) -> Result<(), BrickError> {
        let unexpected: Vec<String> = inputs
            .iter()
            .filter(|input| !self.signature.accepts(input))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(BrickError::UnexpectedInputs {
                application: self.name.clone(),
                inputs: unexpected,
            });
        }
        self.inputs = Some(inputs);
        Ok(())
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Attr) -> Result<(), BrickError> {
        if name == NAME || self.properties.contains_key(name) {
            return Err(BrickError::ReadOnlyAttribute {
                application: self.name.clone(),
                name: name.to_string(),
            });
        }
        if name == INPUTS {
            return self.set_inputs(value.into_names()?);
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    pub(crate) fn add_property(&mut self, name: &str, getter: PropertyFn) -> Result<(), BrickError> {
        if !is_identifier(name) {
            return Err(BrickError::InvalidPropertyName {
                name: name.to_string(),
            });
        }
        self.properties.insert(name.to_string(), getter);
        Ok(())
    }

    pub(crate) fn set_delegate(&mut self, resolver: DelegateFn) {
        self.delegate = Some(resolver);
    }

    // ------------------------------------------------------------------
    // Binding and calling
    // ------------------------------------------------------------------

    /// The view of this application on `brick`, created on first use.
    pub fn bind(self: &Rc<Self>, brick: &BrickRef) -> BoundApplication {
        let mut bound = self.bound.borrow_mut();
        bound.retain(|_, b| b.is_alive());
        bound
            .entry(brick.id())
            .or_insert_with(|| BoundApplication::new(self, brick))
            .clone()
    }

    /// Number of live bricks this application is bound to.
    pub fn bound_count(&self) -> usize {
        self.bound.borrow().values().filter(|b| b.is_alive()).count()
    }

    /// Call the application through `bound` with `args`.
    pub fn apply(&self, bound: &BoundApplication, args: Args) -> Result<Outputs, BrickError> {
        let Args {
            mut positional,
            mut keywords,
        } = args;
        let return_dict = take_flag(&mut keywords, RETURN_DICT)?;
        let return_list = take_flag(&mut keywords, RETURN_LIST)?;
        if return_dict && return_list {
            return Err(BrickError::ConflictingReturnMode);
        }

        let brick = bound.brick()?;
        let call = Rc::new(ApplicationCall::new(&brick, bound.clone()));

        let mut injected = Vec::new();
        if let Some(position) = self.signature.position(APPLICATION_PARAM) {
            injected.push((position, Value::Application(bound.clone())));
        }
        if let Some(position) = self.signature.position(APPLICATION_CALL_PARAM) {
            injected.push((position, Value::Call(call.clone())));
        }
        injected.sort_by_key(|(position, _)| *position);
        for (position, value) in injected {
            positional.insert(position.min(positional.len()), value);
        }
        self.signature.check(positional.len(), &keywords)?;

        if !brick.is_allocated() {
            brick.allocate()?;
        }
        if !brick.is_initialized() && !brick.runtime().is_lazy() {
            brick.initialize()?;
        }

        let guard = brick.runtime().enter(&brick)?;
        for (i, value) in positional.iter_mut().enumerate() {
            if let Value::Variable(variable) = value {
                let name = self.signature.positional_name(i);
                *variable = self.copy_and_tag(&brick, &call, variable, Role::Input, &name)?;
            }
        }
        for (name, value) in keywords.iter_mut() {
            if let Value::Variable(variable) = value {
                *variable = self.copy_and_tag(&brick, &call, variable, Role::Input, name)?;
            }
        }
        let invocation = Invocation::new(
            brick.clone(),
            bound.clone(),
            self.signature.clone(),
            positional,
            keywords,
        );
        let returned = (self.function)(&brick, &invocation);
        drop(guard);
        let Returns(returned) = returned?;

        let declared = match bound.get(OUTPUTS) {
            Ok(attr) => Some(attr.into_names()?),
            Err(BrickError::AttributeNotFound { .. }) => None,
            Err(err) => return Err(err),
        };
        let count = returned.len();
        let mut outputs = Vec::with_capacity(count);
        for (i, value) in returned.into_iter().enumerate() {
            let value = match value {
                Value::Variable(variable) => {
                    let name = match &declared {
                        Some(names) => names.get(i).cloned().ok_or_else(|| {
                            BrickError::UnexpectedOutputs {
                                application: self.name.clone(),
                                declared: names.len(),
                                returned: count,
                            }
                        })?,
                        None => format!("output_{}", i),
                    };
                    Value::Variable(self.copy_and_tag(&brick, &call, &variable, Role::Output, &name)?)
                }
                other => other,
            };
            outputs.push(value);
        }

        if return_list {
            return Ok(Outputs::Sequence(outputs));
        }
        if return_dict {
            let names = declared.ok_or_else(|| BrickError::AttributeNotFound {
                application: self.name.clone(),
                name: OUTPUTS.to_string(),
            })?;
            if names.len() != outputs.len() {
                return Err(BrickError::UnexpectedOutputs {
                    application: self.name.clone(),
                    declared: names.len(),
                    returned: outputs.len(),
                });
            }
            return Ok(Outputs::Dict(names.into_iter().zip(outputs).collect()));
        }
        if outputs.len() == 1 {
            Ok(Outputs::Single(outputs.remove(0)))
        } else {
            Ok(Outputs::Sequence(outputs))
        }
    }

    /// Copy `variable` into a fresh node named after the brick, this
    /// application and `name`, annotated with both and tagged `role`.
    fn copy_and_tag(
        &self,
        brick: &BrickRef,
        call: &Rc<ApplicationCall>,
        variable: &Variable,
        role: Role,
        name: &str,
    ) -> Result<Variable, BrickError> {
        let copy = variable.copy()?;
        copy.set_name(variable_name(brick.name(), &self.name, name));
        add_annotation(&copy, brick.tag().clone());
        add_annotation(&copy, call.clone());
        copy.set_tag_name(name);
        add_role(&copy, role);
        if brick.runtime().print_shapes() {
            info!(variable = %copy, role = %role, shape = %copy.shape(), "tagged variable");
        }
        Ok(copy)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("signature", &self.signature)
            .field("inputs", &self.inputs)
            .field("attributes", &self.attributes)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("delegate", &self.delegate.is_some())
            .finish()
    }
}

/// Property names follow identifier rules: a letter or `_`, then letters,
/// digits or `_`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ApplyFn {
        Rc::new(|_: &BrickRef, _: &Invocation| -> Result<Returns, BrickError> { Ok(Returns::default()) })
    }

    fn definition(params: &[&str]) -> Application {
        Application::new("apply", "Foo", Signature::new(params), noop())
    }

    fn constant(attr: Attr) -> PropertyFn {
        Rc::new(move |_: &BrickRef| -> Result<Attr, BrickError> { Ok(attr.clone()) })
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("outputs"));
        assert!(is_identifier("_dim2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2d"));
        assert!(!is_identifier("out put"));
    }

    #[test]
    fn test_inputs_must_be_parameters() {
        let mut app = definition(&["x", "*rest"]);
        assert!(app.set_inputs(vec!["x".into(), "rest".into()]).is_ok());
        let err = app.set_inputs(vec!["x".into(), "y".into()]).unwrap_err();
        assert!(matches!(
            err,
            BrickError::UnexpectedInputs { ref inputs, .. } if inputs == &["y".to_string()]
        ));
        assert_eq!(app.inputs(), Some(&["x".to_string(), "rest".to_string()][..]));
    }

    #[test]
    fn test_inputs_attribute_routes_through_validation() {
        let mut app = definition(&["x"]);
        assert!(app.set_attribute(INPUTS, Attr::names(["z"])).is_err());
        app.set_attribute(INPUTS, Attr::names(["x"])).unwrap();
        assert_eq!(app.attribute(INPUTS), Some(Attr::names(["x"])));
    }

    #[test]
    fn test_properties_are_read_only() {
        let mut app = definition(&["x"]);
        app.add_property("outputs", constant(Attr::names(["y"]))).unwrap();
        assert!(matches!(
            app.set_attribute("outputs", Attr::names(["z"])),
            Err(BrickError::ReadOnlyAttribute { .. })
        ));
        assert!(matches!(
            app.set_attribute(NAME, Attr::Text("other".into())),
            Err(BrickError::ReadOnlyAttribute { .. })
        ));
        assert!(matches!(
            app.add_property("", constant(Attr::Int(0))),
            Err(BrickError::InvalidPropertyName { .. })
        ));
    }

    #[test]
    fn test_static_attributes() {
        let mut app = definition(&["x"]);
        assert_eq!(app.attribute(NAME), Some(Attr::Text("apply".into())));
        assert_eq!(app.attribute(INPUTS), None);
        assert_eq!(app.attribute(OUTPUTS), None);
        app.set_attribute(OUTPUTS, Attr::names(["y"])).unwrap();
        assert_eq!(app.attribute(OUTPUTS), Some(Attr::names(["y"])));
    }
}
