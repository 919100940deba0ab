//! Selecting tagged variables and snapshotting brick trees.

mod common;

use brickwork_bricks::brickwork_core::{Role, Shape};
use brickwork_bricks::{BrickSummary, Runtime, VariableFilter};
use common::{log, Foo, Mlp};

#[test]
fn test_filter_by_role_brick_and_name() {
    let runtime = Runtime::new();
    let mlp = Mlp::build(&runtime, &[3, 4, 2], &log()).unwrap();
    let x = runtime.graph().input("x", Shape::f32_batch(3));
    mlp.apply("apply", &x).unwrap();

    let layers = mlp.children().unwrap();
    let variables = runtime.graph().variables();

    let weights = VariableFilter::new()
        .roles([Role::Weight])
        .apply(&variables);
    assert_eq!(weights.len(), 2);

    let parameters = VariableFilter::new()
        .roles([Role::Parameter])
        .brick(&layers[0])
        .apply(&variables);
    let names: Vec<_> = parameters.iter().map(|p| p.name().unwrap()).collect();
    assert_eq!(names, ["linear_0_W", "linear_0_b"]);

    let outputs = VariableFilter::new()
        .roles([Role::Output])
        .name("output")
        .apply(&variables);
    let names: Vec<_> = outputs.iter().map(|p| p.name().unwrap()).collect();
    assert_eq!(
        names,
        ["linear_0_apply_output", "linear_1_apply_output", "mlp_apply_output"]
    );
}

#[test]
fn test_filter_by_shape() {
    let runtime = Runtime::new();
    let mlp = Mlp::build(&runtime, &[3, 4, 2], &log()).unwrap();
    let x = runtime.graph().input("x", Shape::f32_batch(3));
    mlp.apply("apply", &x).unwrap();
    let variables = runtime.graph().variables();

    // The open batch axis of each output meets any concrete batch size.
    let wide = VariableFilter::new()
        .roles([Role::Output])
        .shape(Shape::f32_matrix(32, 4))
        .apply(&variables);
    let names: Vec<_> = wide.iter().map(|v| v.name().unwrap()).collect();
    assert_eq!(names, ["linear_0_apply_output"]);

    let first_weight = VariableFilter::new()
        .roles([Role::Parameter])
        .shape(Shape::f32_matrix(3, 4))
        .apply(&variables);
    assert_eq!(first_weight.len(), 1);
    assert_eq!(first_weight[0].name().as_deref(), Some("linear_0_W"));

    let vectors = VariableFilter::new()
        .roles([Role::Output])
        .shape(Shape::f32_vector(4))
        .apply(&variables);
    assert!(vectors.is_empty());
}

#[test]
fn test_filter_by_application() {
    let runtime = Runtime::new();
    let foo = Foo::build(&runtime);
    let x = runtime.graph().input("x", Shape::f32_batch(3));
    foo.apply("apply", &x).unwrap();
    foo.apply("split", &x).unwrap();

    let split = VariableFilter::new()
        .application("split")
        .roles([Role::Output])
        .apply(&runtime.graph().variables());
    let names: Vec<_> = split.iter().map(|v| v.tag_name().unwrap()).collect();
    assert_eq!(names, ["low", "high"]);

    let everything = VariableFilter::new().apply(&runtime.graph().variables());
    assert_eq!(everything.len(), runtime.graph().node_count());
    assert!(!VariableFilter::new().application("apply").matches(&x));
}

#[test]
fn test_summary_reflects_the_tree() {
    let runtime = Runtime::new();
    let mlp = Mlp::build(&runtime, &[3, 4, 2], &log()).unwrap();

    let before = BrickSummary::of(&mlp).unwrap();
    assert!(!before.allocated);
    assert_eq!(before.parameter_count(), 0);
    assert_eq!(before.parameter_size(), Some(0));

    mlp.initialize().unwrap();
    let summary = BrickSummary::of(&mlp).unwrap();

    assert_eq!(summary.name, "mlp");
    assert_eq!(summary.class, "Mlp");
    assert!(summary.allocated && summary.initialized);
    assert_eq!(summary.applications, ["apply"]);
    assert_eq!(summary.children.len(), 2);
    assert_eq!(summary.children[1].name, "linear_1");
    assert_eq!(summary.children[1].parameters[0].shape, Shape::f32_matrix(4, 2));
    assert_eq!(summary.children[1].parameters[1].roles, vec![Role::Bias]);
    assert_eq!(summary.children[1].parameters[0].size, Some(8));
    assert_eq!(summary.parameter_count(), 4);
    assert_eq!(summary.parameter_size(), Some(3 * 4 + 4 + 4 * 2 + 2));
}

#[test]
fn test_summary_json_round_trip() {
    let runtime = Runtime::new();
    let mlp = Mlp::build(&runtime, &[2, 2], &log()).unwrap();
    mlp.allocate().unwrap();

    let summary = BrickSummary::of(&mlp).unwrap();
    let json = summary.to_json().unwrap();
    assert!(json.contains("\"linear_0_W\""));

    let restored = BrickSummary::from_json(&json).unwrap();
    assert_eq!(restored, summary);
}
