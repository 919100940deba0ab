mod common;

use brickwork_bricks::brickwork_core::Shape;
use brickwork_bricks::{Args, BrickError, Runtime};
use common::{entries, log, Foo, Recorder};
use proptest::prelude::*;

proptest! {
    #[test]
    fn children_allocate_before_parents_and_reallocation_is_stable(
        widths in prop::collection::vec(0usize..4, 1..4),
    ) {
        let runtime = Runtime::new();
        let events = log();

        // One level per width, each parent holding `width` fresh leaves
        // plus the previous level's root.
        let mut root = Recorder::build(&runtime, "level_0", vec![], &events);
        for (depth, width) in widths.iter().enumerate() {
            let mut children: Vec<_> = (0..*width)
                .map(|i| Recorder::build(&runtime, &format!("leaf_{}_{}", depth, i), vec![], &events))
                .collect();
            children.push(root);
            root = Recorder::build(&runtime, &format!("level_{}", depth + 1), children, &events);
        }

        root.allocate().unwrap();
        let first = entries(&events);
        let position = |event: &str| first.iter().position(|e| e == event).unwrap();
        for depth in 0..widths.len() {
            let allocate_child = format!("allocate level_{}", depth);
            let allocate_parent = format!("allocate level_{}", depth + 1);
            prop_assert!(position(&allocate_child) < position(&allocate_parent));
            let push_parent = format!("push_allocation_config level_{}", depth + 1);
            let push_child = format!("push_allocation_config level_{}", depth);
            prop_assert!(position(&push_parent) < position(&push_child));
        }

        let params = root.params().unwrap();
        root.allocate().unwrap();
        let again = root.params().unwrap();
        prop_assert!(root.is_allocated());
        prop_assert_eq!(params.len(), again.len());
        prop_assert_eq!(params[0].name(), again[0].name());
        prop_assert_eq!(params[0].shape(), again[0].shape());
    }

    #[test]
    fn both_return_flags_always_conflict(
        dict in any::<bool>(),
        list in any::<bool>(),
        dict_first in any::<bool>(),
    ) {
        let runtime = Runtime::new();
        let foo = Foo::build(&runtime);
        let x = runtime.graph().input("x", Shape::f32_batch(2));

        let mut args = Args::new().arg(&x);
        let flags = if dict_first {
            [("return_dict", dict), ("return_list", list)]
        } else {
            [("return_list", list), ("return_dict", dict)]
        };
        for (flag, value) in flags {
            args = args.kwarg(flag, value);
        }

        let result = foo.apply("apply", args);
        if dict && list {
            prop_assert!(matches!(result, Err(BrickError::ConflictingReturnMode)));
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(result.unwrap().len(), 1);
        }
        prop_assert_eq!(runtime.call_depth(), 0);
    }

    #[test]
    fn varargs_are_numbered_in_order(count in 0usize..6) {
        let runtime = Runtime::new();
        let foo = Foo::build(&runtime);
        let graph = runtime.graph();
        let mut args = Args::new().arg(&graph.input("x", Shape::f32_scalar()));
        for i in 0..count {
            args = args.arg(&graph.input(format!("extra_{}", i), Shape::f32_scalar()));
        }

        let outputs = foo.apply("echo", args).unwrap().into_variables().unwrap();

        prop_assert_eq!(outputs.len(), count + 1);
        for (i, output) in outputs.iter().enumerate() {
            prop_assert_eq!(output.name(), Some(format!("foo_echo_output_{}", i)));
            let tagged = output.inputs()[0].tag_name().unwrap();
            let expected = if i == 0 { "x".to_string() } else { format!("rest_{}", i - 1) };
            prop_assert_eq!(tagged, expected);
        }
    }
}
