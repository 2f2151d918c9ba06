//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pamdash::plugin::{loader_fn, Plugin};
use pamdash::store::{Action, Store};
use serde_json::Value;

pub const RECORDER: &str = "recorder";

/// Registers a module that logs the type of every dispatched action.
pub fn record_actions(store: &Store) {
    store.register_module(
        RECORDER,
        |log: &Arc<Vec<String>>, action: &Action| {
            let mut next = (**log).clone();
            next.push(action.kind.clone());
            Arc::new(next)
        },
        Vec::<String>::new(),
    );
}

pub fn recorded(store: &Store) -> Vec<String> {
    store
        .module::<Vec<String>>(RECORDER)
        .map(|log| (*log).clone())
        .unwrap_or_default()
}

pub fn count(store: &Store, kind: &str) -> usize {
    recorded(store).iter().filter(|k| *k == kind).count()
}

/// Data-source plugin whose loader always returns `result`.
pub fn fixed_loader(id: &str, result: Value) -> Plugin {
    Plugin::data_source(
        id,
        format!("{id} loader"),
        "1.0.0",
        loader_fn(move |_, _| {
            let result = result.clone();
            async move { Ok(result) }
        }),
    )
}

/// Shared sink for values observed by hooks.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<Value>>>);

impl Captured {
    pub fn push(&self, value: Value) {
        self.0.lock().unwrap().push(value);
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }
}
