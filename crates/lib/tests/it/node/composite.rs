use canopy::{
    Composite, Document, ListenScope, METADATA_SUFFIX, Metadata, Notify, Property, Value,
};

use crate::helpers::*;

#[test]
fn test_qualified_names() {
    let root = settings_tree();
    let paths: Vec<String> = ["volume", "audio", "audio/muted", "audio/device", "theme"]
        .iter()
        .map(|p| root.find(p).unwrap().qualified_name().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/root/volume",
            "/root/audio",
            "/root/audio/muted",
            "/root/audio/device",
            "/root/theme"
        ]
    );

    let named = Composite::new(
        Document::new().with("x", 1),
        Metadata::new().with_name("config"),
    );
    assert_eq!(named.child("x").unwrap().qualified_name(), "/config/x");
}

#[test]
fn test_scalar_document_round_trip() {
    reset_bus();
    let doc = Document::new()
        .with("n", 1)
        .with("f", 2.5)
        .with("s", "text")
        .with("b", true)
        .with("z", Value::Null)
        .with("nested", Document::new().with("k", "v"));
    let root = Composite::new(doc.clone(), Metadata::new());

    assert_eq!(root.to_document(false), doc);
    assert_eq!(root.value(), Value::Doc(doc));
}

#[test]
fn test_undefined_survives_document_but_not_json() {
    reset_bus();
    let root = Composite::new(
        Document::new().with("pending", Value::Undefined).with("n", 1),
        Metadata::new(),
    );
    let doc = root.to_document(false);
    assert_eq!(doc.get("pending"), Some(&Value::Undefined));
    assert_eq!(doc.to_json(), serde_json::json!({ "n": 1 }));
}

#[test]
fn test_set_value_on_composite_fires_once_for_itself() {
    let root = settings_tree();
    let audio = root.composite("audio").unwrap();
    let direct = Recorder::new();
    let subtree = Recorder::new();
    audio.on_change(&direct.listener, ListenScope::Direct);
    root.on_change(&subtree.listener, ListenScope::Subtree);

    audio.set_value(Document::new().with("muted", true).with("device", "default"));

    let events = direct.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "/root/audio");
    assert_eq!(
        events[0].old,
        Value::Doc(Document::new().with("muted", false).with("device", "default"))
    );
    assert_eq!(
        events[0].new,
        Value::Doc(Document::new().with("muted", true).with("device", "default"))
    );

    // The leaf change and the composite change both bubble to the root.
    assert_eq!(subtree.names(), vec!["/root", "/root"]);
}

#[test]
fn test_set_value_on_composite_with_same_document_is_noop() {
    let root = settings_tree();
    let audio = root.composite("audio").unwrap();
    let recorder = Recorder::new();
    audio.on_change(&recorder.listener, ListenScope::Subtree);

    let same = audio.to_document(false);
    assert_eq!(audio.try_set_value(same.into(), Notify::Fire), Ok(false));
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_composite_validator_gates_documents() {
    reset_bus();
    let root = Composite::new(
        Document::new().with("a", 1),
        Metadata::new().with_predicate(|v| {
            v.as_document()
                .is_some_and(|doc| doc.contains_key("a"))
        }),
    );

    root.set_value(Document::new().with("b", 2));
    assert_eq!(root.child_names(), vec!["a"]);

    root.set_value(Document::new().with("a", 2).with("b", 2));
    assert_eq!(root.child_names(), vec!["a", "b"]);
}

#[test]
fn test_merge_rejection_in_set_value_changes_nothing() {
    let root = settings_tree();
    let audio = root.composite("audio").unwrap();
    let recorder = Recorder::new();
    root.on_change(&recorder.listener, ListenScope::Subtree);
    let before = root.to_document(false);

    let err = audio
        .try_set_value(
            Document::new()
                .with("muted", Document::new().with("x", 1))
                .with("device", "usb")
                .into(),
            Notify::Fire,
        )
        .unwrap_err();

    assert!(err.is_merge_error());
    assert_eq!(err.path(), "/root/audio/muted");
    assert_eq!(root.to_document(false), before);
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_remove_child_fires_nothing() {
    let root = settings_tree();
    let recorder = Recorder::new();
    root.on_change(&recorder.listener, ListenScope::Subtree);

    let removed = root.remove_child("theme").unwrap();
    assert_eq!(removed.value(), "dark");
    assert!(!root.contains("theme"));
    assert!(root.remove_child("theme").is_none());
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_clone_is_isolated_both_ways() {
    let root = settings_tree();
    let copy = root.clone_tree();
    assert_eq!(copy.to_document(false), root.to_document(false));

    let original_events = Recorder::new();
    let copy_events = Recorder::new();
    root.on_change(&original_events.listener, ListenScope::Subtree);
    copy.on_change(&copy_events.listener, ListenScope::Subtree);

    copy.find("audio/muted").unwrap().set_value(true);
    assert_eq!(original_events.count(), 0);
    assert_eq!(copy_events.count(), 1);
    assert_eq!(root.find("audio/muted").unwrap().value(), false);

    root.leaf("volume").unwrap().set_value(10);
    assert_eq!(original_events.count(), 1);
    assert_eq!(copy_events.count(), 1);
    assert_eq!(copy.leaf("volume").unwrap().value(), 3);
}

#[test]
fn test_clone_does_not_copy_listeners() {
    let root = settings_tree();
    let recorder = Recorder::new();
    root.leaf("theme")
        .unwrap()
        .on_change(&recorder.listener, ListenScope::Direct);

    let copy = root.clone_tree();
    copy.leaf("theme").unwrap().set_value("light");
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_clone_keeps_name_and_validators() {
    reset_bus();
    let root = Composite::new(
        Document::new(),
        Metadata::new()
            .with_name("prefs")
            .with_predicate(|v| v.is_document()),
    );
    root.create_child_with(
        "level",
        1,
        Metadata::new().with_predicate(|v| v.as_int().is_some_and(|n| n <= 5)),
    );

    let copy = root.clone_tree();
    assert_eq!(copy.qualified_name(), "/prefs");
    assert!(copy.has_validator());

    let level = copy.leaf("level").unwrap();
    assert!(level.has_validator());
    assert_eq!(level.set_value(9), 1);
    assert_eq!(level.set_value(4), 4);
}

#[test]
fn test_metadata_serialization() {
    reset_bus();
    let root = Composite::empty();
    root.create_child_with("port", 8080, Metadata::new().with("owner", "ops"))
        .create_child("host", "localhost");

    let doc = root.to_document(true);
    let json = doc.to_json();
    assert_eq!(json["port"], 8080);
    assert_eq!(json[format!("port{METADATA_SUFFIX}")]["owner"], "ops");
    assert!(json.get(format!("host{METADATA_SUFFIX}")).is_none());

    // The same document rebuilds the metadata
    let rebuilt = Composite::new(doc, Metadata::new());
    assert_eq!(
        rebuilt.child("port").unwrap().metadata().get("owner"),
        Some(&Value::from("ops"))
    );
}
