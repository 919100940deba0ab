//! Bricks shared by the integration tests.

#![allow(dead_code)]

use brickwork_bricks::brickwork_core::{add_role, Role, Shape, Variable};
use brickwork_bricks::{
    Attr, Brick, BrickCore, BrickError, BrickRef, ClassBuilder, InitArgs, InitSignature, Lazy,
    Runtime, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared event log, for observing hook order.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ============================================================================
// Foo: one input, declared outputs
// ============================================================================

pub struct Foo {
    core: BrickCore,
}

impl Foo {
    pub fn build(runtime: &Runtime) -> BrickRef {
        Self::named(runtime, None)
    }

    pub fn named(runtime: &Runtime, name: Option<&str>) -> BrickRef {
        BrickRef::new(Foo {
            core: BrickCore::new::<Foo>(runtime, name),
        })
        .unwrap()
    }
}

impl Brick for Foo {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x"], |foo, inv| {
                let x = inv.input("x")?;
                Ok(foo.core.runtime().graph().apply("plus_one", &[&x], x.shape())?)
            })?
            .inputs(["x"])?
            .outputs(["y"])?;

        class
            .application("split", &["x"], |foo, inv| {
                let x = inv.input("x")?;
                let graph = foo.core.runtime().graph();
                Ok(vec![
                    graph.apply("low", &[&x], x.shape())?,
                    graph.apply("high", &[&x], x.shape())?,
                ])
            })?
            .outputs(["low", "high"])?;

        // Hands every argument straight back; no declared outputs.
        class.application("echo", &["x", "*rest"], |_, inv| {
            Ok(inv.positional().to_vec())
        })?;

        // Declares one output name but returns two variables.
        class
            .application("overflow", &["x"], |_, inv| {
                let x = inv.input("x")?;
                Ok(vec![x.clone(), x])
            })?
            .outputs(["only"])?;

        class
            .application("monitored", &["x", "application_call"], |foo, inv| {
                let x = inv.input("x")?;
                let call = inv.application_call()?;
                let graph = foo.core.runtime().graph();
                let mean = graph.apply("mean", &[&x], Shape::f32_scalar())?;
                call.add_auxiliary_variable(&mean, &[Role::Output], Some("mean"));
                Ok(graph.apply("plus_one", &[&x], x.shape())?)
            })?
            .outputs(["y"])?;

        class.application("introspect", &["application", "x", "mask"], |_, inv| {
            let application = inv.bound_application()?;
            let mask = inv.variable("mask")?;
            Ok(vec![
                Value::Text(application.name().to_string()),
                Value::Variable(inv.input("x")?),
                Value::Bool(mask.is_some()),
            ])
        })?;

        class
            .application("twice", &["x"], |_, inv| {
                let once = inv.brick().apply("apply", &inv.input("x")?)?;
                inv.brick().apply("apply", once.into_variable()?)?.into_variable()
            })?
            .outputs(["z"])?;

        Ok(())
    }
}

// ============================================================================
// Linear: lazily configured dimensions, weight and bias
// ============================================================================

pub struct Linear {
    core: BrickCore,
    pub input_dim: Lazy<usize>,
    pub output_dim: Lazy<usize>,
    log: Log,
}

impl Linear {
    pub fn signature() -> InitSignature<usize> {
        InitSignature::new()
            .required("input_dim")
            .required("output_dim")
    }

    pub fn build(
        runtime: &Runtime,
        name: &str,
        args: InitArgs<usize>,
        log: &Log,
    ) -> Result<BrickRef, BrickError> {
        let mut args = Self::signature().bind(runtime, args)?;
        BrickRef::new(Linear {
            core: BrickCore::new::<Linear>(runtime, Some(name)),
            input_dim: args.take("input_dim"),
            output_dim: args.take("output_dim"),
            log: log.clone(),
        })
    }

    fn record(&self, event: &str) {
        self.log
            .borrow_mut()
            .push(format!("{} {}", event, self.core.name()));
    }
}

impl Brick for Linear {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x"], |linear, inv| {
                let x = inv.input("x")?;
                let params = linear.core.params().variables();
                let operands: Vec<&Variable> = std::iter::once(&x).chain(params.iter()).collect();
                let output_dim = *linear.output_dim.require(linear.core.name(), "output_dim")?;
                let graph = linear.core.runtime().graph();
                Ok(graph.apply("affine", &operands, Shape::f32_batch(output_dim))?)
            })?
            .inputs(["x"])?
            .outputs(["output"])?;
        Ok(())
    }

    fn do_push_allocation_config(&mut self) -> Result<(), BrickError> {
        self.record("push_allocation_config");
        Ok(())
    }

    fn do_push_initialization_config(&mut self) -> Result<(), BrickError> {
        self.record("push_initialization_config");
        Ok(())
    }

    fn do_allocate(&mut self) -> Result<(), BrickError> {
        let name = self.core.name().to_string();
        let input_dim = *self.input_dim.require(&name, "input_dim")?;
        let output_dim = *self.output_dim.require(&name, "output_dim")?;
        let graph = self.core.runtime().graph().clone();

        let weight = graph.shared(format!("{}_W", name), Shape::f32_matrix(input_dim, output_dim));
        add_role(&weight, Role::Weight);
        let bias = graph.shared(format!("{}_b", name), Shape::f32_vector(output_dim));
        add_role(&bias, Role::Bias);

        self.core.params_mut().push(weight);
        self.core.params_mut().push(bias);
        self.record("allocate");
        Ok(())
    }

    fn do_initialize(&mut self) -> Result<(), BrickError> {
        self.record("initialize");
        Ok(())
    }

    fn get_dim(&self, name: &str) -> Result<usize, BrickError> {
        match name {
            "input" => self.input_dim.require(self.core.name(), "input_dim").copied(),
            "output" => self.output_dim.require(self.core.name(), "output_dim").copied(),
            _ => Err(BrickError::NoDimension {
                name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Mlp: configures its linear children
// ============================================================================

pub struct Mlp {
    core: BrickCore,
    pub dims: Vec<usize>,
    log: Log,
}

impl Mlp {
    /// Layers are created without dimensions; the MLP pushes them down.
    pub fn build(runtime: &Runtime, dims: &[usize], log: &Log) -> Result<BrickRef, BrickError> {
        let layers = (0..dims.len().saturating_sub(1))
            .map(|i| Linear::build(runtime, &format!("linear_{}", i), InitArgs::new(), log))
            .collect::<Result<Vec<_>, _>>()?;
        BrickRef::new(Mlp {
            core: BrickCore::new::<Mlp>(runtime, None).with_children(layers),
            dims: dims.to_vec(),
            log: log.clone(),
        })
    }
}

impl Brick for Mlp {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x"], |mlp, inv| {
                let mut h = inv.input("x")?;
                for layer in mlp.core.children() {
                    h = layer.apply("apply", &h)?.into_variable()?;
                }
                Ok(h)
            })?
            .outputs(["output"])?;
        Ok(())
    }

    fn do_push_allocation_config(&mut self) -> Result<(), BrickError> {
        for (i, layer) in self.core.children().iter().enumerate() {
            let (input_dim, output_dim) = (self.dims[i], self.dims[i + 1]);
            layer.with_mut(|linear: &mut Linear| {
                linear.input_dim.set(input_dim);
                linear.output_dim.set(output_dim);
            })?;
        }
        self.log
            .borrow_mut()
            .push(format!("push_allocation_config {}", self.core.name()));
        Ok(())
    }

    fn do_allocate(&mut self) -> Result<(), BrickError> {
        self.log
            .borrow_mut()
            .push(format!("allocate {}", self.core.name()));
        Ok(())
    }

    fn do_initialize(&mut self) -> Result<(), BrickError> {
        self.log
            .borrow_mut()
            .push(format!("initialize {}", self.core.name()));
        Ok(())
    }
}

// ============================================================================
// Recorder: observable hooks, optional failures
// ============================================================================

#[derive(Default, Clone, Copy)]
pub struct Failures {
    pub push: bool,
    pub allocate: bool,
    pub initialize: bool,
}

pub struct Recorder {
    core: BrickCore,
    pub fail: Failures,
    log: Log,
}

impl Recorder {
    pub fn build(runtime: &Runtime, name: &str, children: Vec<BrickRef>, log: &Log) -> BrickRef {
        Self::failing(runtime, name, children, log, Failures::default())
    }

    pub fn failing(
        runtime: &Runtime,
        name: &str,
        children: Vec<BrickRef>,
        log: &Log,
        fail: Failures,
    ) -> BrickRef {
        BrickRef::new(Recorder {
            core: BrickCore::new::<Recorder>(runtime, Some(name)).with_children(children),
            fail,
            log: log.clone(),
        })
        .unwrap()
    }

    fn record(&self, event: &str) {
        self.log
            .borrow_mut()
            .push(format!("{} {}", event, self.core.name()));
    }
}

impl Brick for Recorder {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class.application("apply", &["x"], |_, inv| inv.input("x"))?;
        Ok(())
    }

    fn do_push_allocation_config(&mut self) -> Result<(), BrickError> {
        if self.fail.push {
            return Err(BrickError::hook("push rejected"));
        }
        self.record("push_allocation_config");
        Ok(())
    }

    fn do_push_initialization_config(&mut self) -> Result<(), BrickError> {
        self.record("push_initialization_config");
        Ok(())
    }

    fn do_allocate(&mut self) -> Result<(), BrickError> {
        if !self.core.children().iter().all(BrickRef::is_allocated) {
            return Err(BrickError::hook("children not allocated"));
        }
        if self.fail.allocate {
            return Err(BrickError::hook("allocation failed"));
        }
        let graph = self.core.runtime().graph().clone();
        let w = graph.shared(format!("{}_w", self.core.name()), Shape::f32_vector(2));
        self.core.params_mut().push(w);
        self.record("allocate");
        Ok(())
    }

    fn do_initialize(&mut self) -> Result<(), BrickError> {
        if !self.core.children().iter().all(BrickRef::is_initialized) {
            return Err(BrickError::hook("children not initialized"));
        }
        if self.fail.initialize {
            return Err(BrickError::hook("initialization failed"));
        }
        self.record("initialize");
        Ok(())
    }
}

// ============================================================================
// Wrapper: properties, delegation, and applying another brick
// ============================================================================

pub struct Wrapper {
    core: BrickCore,
    inner: BrickRef,
    pub width: usize,
    pub labels: Vec<String>,
}

impl Wrapper {
    /// With `adopt`, `inner` becomes a child; otherwise it is only held.
    pub fn build(runtime: &Runtime, inner: &BrickRef, adopt: bool) -> BrickRef {
        let mut core = BrickCore::new::<Wrapper>(runtime, None);
        if adopt {
            core.add_child(inner.clone());
        }
        BrickRef::new(Wrapper {
            core,
            inner: inner.clone(),
            width: 4,
            labels: vec!["first".to_string(), "second".to_string()],
        })
        .unwrap()
    }
}

impl Brick for Wrapper {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x"], |wrapper, inv| {
                wrapper.inner.apply("apply", &inv.input("x")?)?.into_variable()
            })?
            .property("width", |wrapper| Ok(Attr::Int(wrapper.width as i64)))?
            .delegate(|wrapper| wrapper.inner.application("apply"));

        class
            .application("pair", &["x"], |_, inv| {
                let x = inv.input("x")?;
                Ok(vec![x.clone(), x])
            })?
            .property("outputs", |wrapper| Ok(Attr::names(wrapper.labels.clone())))?;

        Ok(())
    }
}
