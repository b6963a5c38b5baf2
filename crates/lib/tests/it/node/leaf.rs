use std::{cell::Cell, rc::Rc};

use canopy::{
    Callable, Composite, Document, ListenScope, Metadata, Notify, Property, Value,
    node::NodeError,
};

use crate::helpers::*;

fn positive() -> Metadata {
    Metadata::new().with_predicate(|v| v.as_int().is_some_and(|n| n > 0))
}

#[test]
fn test_change_counting_ignores_equal_values() {
    let root = settings_tree();
    let volume = root.leaf("volume").unwrap();
    let recorder = Recorder::new();
    volume.on_change(&recorder.listener, ListenScope::Direct);

    volume.set_value(1);
    volume.set_value(2);
    volume.set_value(3);
    volume.set_value(3);

    // 3 -> 1 -> 2 -> 3 -> 3
    assert_eq!(recorder.count(), 3);
    let last = recorder.events().pop().unwrap();
    assert_eq!(last.old, 2);
    assert_eq!(last.new, 3);
    assert_eq!(last.name, "/root/volume");
}

#[test]
fn test_listener_registered_twice_fires_twice() {
    let root = settings_tree();
    let theme = root.leaf("theme").unwrap();
    let recorder = Recorder::new();
    theme
        .on_change(&recorder.listener, ListenScope::Direct)
        .on_change(&recorder.listener, ListenScope::Direct);

    theme.set_value("light");
    assert_eq!(recorder.count(), 2);
}

#[test]
fn test_validator_keeps_last_valid_value() {
    reset_bus();
    let root = Composite::empty();
    root.create_child_with("count", 1, positive());
    let count = root.leaf("count").unwrap();
    let recorder = Recorder::new();
    count.on_change(&recorder.listener, ListenScope::Direct);

    assert_eq!(count.set_value(5), 5);
    assert_eq!(count.set_value(-1), 5);
    assert_eq!(count.set_value(0), 5);

    assert_eq!(recorder.count(), 1);
    assert_eq!(
        count.try_set_value(Value::Int(-3), Notify::Fire),
        Err(NodeError::ValidationRejected {
            name: "/root/count".to_string()
        })
    );
}

#[test]
fn test_validator_not_called_for_equal_value() {
    reset_bus();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let validator = Callable::predicate(move |_| {
        c.set(c.get() + 1);
        true
    });

    let root = Composite::empty();
    root.create_child_with("n", 1, Metadata::new().with_validator(validator));
    let n = root.leaf("n").unwrap();

    n.set_value(1);
    assert_eq!(calls.get(), 0);
    n.set_value(2);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_validator_can_be_replaced_live() {
    reset_bus();
    let root = Composite::empty();
    root.create_child("n", 1);
    let n = root.leaf("n").unwrap();
    assert!(!n.has_validator());

    n.metadata_mut().insert(
        "validator",
        Callable::predicate(|v| v.as_int().is_some_and(|n| n < 10)),
    );
    assert!(n.has_validator());
    assert_eq!(n.set_value(50), 1);
    assert_eq!(n.set_value(9), 9);
}

#[test]
fn test_rejections_are_fail_soft() {
    let root = settings_tree();
    let theme = root.leaf("theme").unwrap();
    let recorder = Recorder::new();
    theme.on_change(&recorder.listener, ListenScope::Direct);

    assert_eq!(theme.set_value(Value::Undefined), "dark");
    assert_eq!(theme.set_value(Document::new().with("a", 1)), "dark");
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_errors_convert_to_crate_error() {
    let root = settings_tree();
    let theme = root.leaf("theme").unwrap();

    let err: canopy::Error = theme
        .try_set_value(Document::new().into(), Notify::Fire)
        .unwrap_err()
        .into();
    assert_eq!(err.module(), "node");
    assert!(err.is_kind_mismatch());
    assert!(!err.is_merge_error());
    assert!(!err.is_retryable());
}

#[test]
fn test_nan_is_never_equal() {
    reset_bus();
    let root = Composite::empty();
    root.create_child("x", f64::NAN);
    let x = root.leaf("x").unwrap();
    let recorder = Recorder::new();
    x.on_change(&recorder.listener, ListenScope::Direct);

    x.set_value(f64::NAN);
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_callables_compare_by_identity() {
    reset_bus();
    let f = Callable::new(|_| Value::Null);
    let g = Callable::new(|_| Value::Null);

    let root = Composite::empty();
    root.create_child("handler", f.clone());
    let handler = root.leaf("handler").unwrap();
    let recorder = Recorder::new();
    handler.on_change(&recorder.listener, ListenScope::Direct);

    handler.set_value(f);
    assert_eq!(recorder.count(), 0);
    handler.set_value(g.clone());
    assert_eq!(recorder.count(), 1);
    assert!(handler.value().as_callable().unwrap().ptr_eq(&g));
}

#[test]
fn test_suppressed_change_still_updates() {
    let root = settings_tree();
    let volume = root.leaf("volume").unwrap();
    let recorder = Recorder::new();
    root.on_change(&recorder.listener, ListenScope::Subtree);

    volume.set_value_with(8, Notify::Suppress);
    assert_eq!(volume.value(), 8);
    assert_eq!(recorder.count(), 0);
}
