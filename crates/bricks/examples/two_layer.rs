//! Two Layers: Lazy Configuration, Allocation and Tagging
//!
//! Run with: cargo run -p brickwork-bricks --example two_layer
//!
//! A two-layer network is built with no dimensions at all. The parent pushes
//! them to its layers when it is first applied, the layers allocate their
//! weights, and every variable crossing an application boundary comes out
//! renamed and tagged.

use brickwork_bricks::brickwork_core::{add_role, Role, Shape, Variable};
use brickwork_bricks::{
    Attr, Brick, BrickCore, BrickError, BrickRef, BrickSummary, ClassBuilder, InitArgs,
    InitSignature, Lazy, Runtime, VariableFilter,
};

// ============================================================================
// Bricks
// ============================================================================

struct Dense {
    core: BrickCore,
    input_dim: Lazy<usize>,
    output_dim: Lazy<usize>,
}

impl Dense {
    fn build(runtime: &Runtime, name: &str, args: InitArgs<usize>) -> Result<BrickRef, BrickError> {
        let mut args = InitSignature::new()
            .required("input_dim")
            .required("output_dim")
            .bind(runtime, args)?;
        BrickRef::new(Dense {
            core: BrickCore::new::<Dense>(runtime, Some(name)),
            input_dim: args.take("input_dim"),
            output_dim: args.take("output_dim"),
        })
    }
}

impl Brick for Dense {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x"], |dense, inv| {
                let x = inv.input("x")?;
                let params = dense.core.params().variables();
                let operands: Vec<&Variable> = std::iter::once(&x).chain(params.iter()).collect();
                let output_dim = *dense.output_dim.require(dense.core.name(), "output_dim")?;
                let graph = dense.core.runtime().graph();
                Ok(graph.apply("affine", &operands, Shape::f32_batch(output_dim))?)
            })?
            .inputs(["x"])?
            .outputs(["output"])?
            .property("dim", |dense| {
                let dim = *dense.output_dim.require(dense.core.name(), "output_dim")?;
                Ok(Attr::Int(dim as i64))
            })?;
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

struct TwoLayer {
    core: BrickCore,
    dims: [usize; 3],
}

impl Brick for TwoLayer {
    fn core(&self) -> &BrickCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrickCore {
        &mut self.core
    }

    fn define(class: &mut ClassBuilder<Self>) -> Result<(), BrickError> {
        class
            .application("apply", &["x", "application_call"], |net, inv| {
                let mut h = inv.input("x")?;
                for layer in net.core.children() {
                    h = layer.apply("apply", &h)?.into_variable()?;
                }
                let graph = net.core.runtime().graph();
                let norm = graph.apply("l2_norm", &[&h], Shape::f32_scalar())?;
                inv.application_call()?
                    .add_auxiliary_variable(&norm, &[Role::Output], Some("norm"));
                Ok(h)
            })?
            .outputs(["output"])?;
        Ok(())
    }

    fn do_push_allocation_config(&mut self) -> Result<(), BrickError> {
        for (i, layer) in self.core.children().iter().enumerate() {
            let (input_dim, output_dim) = (self.dims[i], self.dims[i + 1]);
            layer.with_mut(|dense: &mut Dense| {
                dense.input_dim.set(input_dim);
                dense.output_dim.set(output_dim);
            })?;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Two Layers: Lazy Configuration, Allocation and Tagging ===\n");

    let runtime = Runtime::new();

    // -------------------------------------------------------------------------
    // 1. Construction without dimensions
    // -------------------------------------------------------------------------
    println!("1. Construction without dimensions");
    println!("----------------------------------\n");

    let hidden = Dense::build(&runtime, "hidden", InitArgs::new())?;
    let readout = Dense::build(&runtime, "readout", InitArgs::new())?;
    let net = BrickRef::new(TwoLayer {
        core: BrickCore::new::<TwoLayer>(&runtime, Some("net")).with_children([hidden, readout]),
        dims: [8, 16, 4],
    })?;

    println!("  lazy: {}", runtime.is_lazy());
    println!("  allocated: {}", net.is_allocated());
    match net.children()?[0].get_dim("input") {
        Ok(dim) => println!("  hidden input dim: {}", dim),
        Err(err) => println!("  hidden input dim: {}", err),
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Applying pushes configuration and allocates
    // -------------------------------------------------------------------------
    println!("2. Applying pushes configuration and allocates");
    println!("----------------------------------------------\n");

    let x = runtime.graph().input("x", Shape::f32_batch(8));
    let y = net.apply("apply", &x)?.into_variable()?;

    println!("  output: {} with shape {}", y, y.shape());
    println!("  roles: {:?}", y.roles());
    for layer in net.children()? {
        let dims = layer.get_dims(&["input", "output"])?;
        let dim = layer.application("apply")?.get("dim")?;
        println!("  {}: {:?} (dim property: {:?})", layer.name(), dims, dim);
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Finding variables by their tags
    // -------------------------------------------------------------------------
    println!("3. Finding variables by their tags");
    println!("----------------------------------\n");

    let variables = runtime.graph().variables();
    for weight in VariableFilter::new().roles([Role::Weight]).apply(&variables) {
        println!("  weight {} {}", weight, weight.shape());
    }
    for aux in VariableFilter::new().roles([Role::Auxiliary]).apply(&variables) {
        println!("  auxiliary {}", aux);
    }
    println!();

    // -------------------------------------------------------------------------
    // 4. Summary
    // -------------------------------------------------------------------------
    println!("4. Summary");
    println!("----------\n");

    net.initialize()?;
    let summary = BrickSummary::of(&net)?;
    println!("  {} parameters", summary.parameter_count());
    println!("{}", summary.to_json()?);

    Ok(())
}
