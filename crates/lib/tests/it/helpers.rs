use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use canopy::{Composite, Document, Listener, Metadata, Value, notify};

/// One recorded listener call
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub old: Value,
    pub new: Value,
    pub name: String,
}

/// Listener that records every call it receives
#[derive(Clone)]
pub struct Recorder {
    pub listener: Listener,
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let listener = Listener::new(move |old, new, name| {
            sink.borrow_mut().push(Event {
                old: old.clone(),
                new: new.clone(),
                name: name.to_string(),
            });
        });
        Self { listener, events }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }
}

/// Listener that only counts calls, optionally tagged with a hash
pub fn counter(hash: Option<&str>) -> (Listener, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    let listener = Listener::new(move |_, _, _| c.set(c.get() + 1));
    let listener = match hash {
        Some(hash) => listener.with_hash(hash),
        None => listener,
    };
    (listener, count)
}

/// Fresh bus state for tests that touch transactions or optimization flags
pub fn reset_bus() {
    notify::reset();
}

/// A small settings tree:
///
/// ```text
/// /root
///   volume: 3
///   audio
///     muted: false
///     device: "default"
///   theme: "dark"
/// ```
pub fn settings_tree() -> Composite {
    reset_bus();
    Composite::new(
        Document::new()
            .with("volume", 3)
            .with(
                "audio",
                Document::new().with("muted", false).with("device", "default"),
            )
            .with("theme", "dark"),
        Metadata::new(),
    )
}
