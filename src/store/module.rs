//! State modules and the combined reducer.
//!
//! Each [`Module`] owns one named slice of the state tree. Slices are stored
//! type-erased (`Arc<dyn Any + Send + Sync>`) and recovered with
//! [`StateSnapshot::get`]; reducers are registered with their concrete slice
//! type and wrapped so the combined reducer can drive them uniformly.
//!
//! # Referential equality
//!
//! A reducer signals "no change" by returning the `Arc` it was given. The
//! combined reducer then returns the previous [`StateSnapshot`] itself, so
//! callers can compare snapshots with [`StateSnapshot::ptr_eq`] instead of
//! deep comparison.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::action::Action;

/// Type-erased state slice.
pub type Slice = Arc<dyn Any + Send + Sync>;

type ErasedReducer = Arc<dyn Fn(&Slice, &Action) -> Slice + Send + Sync>;

/// A named state slice with its reducer and initial value.
#[derive(Clone)]
pub struct Module {
    name: String,
    reducer: ErasedReducer,
    initial_state: Slice,
}

impl Module {
    /// Creates a module whose slice has type `S`.
    ///
    /// The reducer must return its input `Arc` when the action does not
    /// change the slice.
    pub fn new<S, F>(name: impl Into<String>, reducer: F, initial_state: S) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&Arc<S>, &Action) -> Arc<S> + Send + Sync + 'static,
    {
        let name = name.into();
        let module_name = name.clone();
        let erased: ErasedReducer = Arc::new(move |slice: &Slice, action: &Action| -> Slice {
            match Arc::clone(slice).downcast::<S>() {
                Ok(typed) => {
                    let next = reducer(&typed, action);
                    if Arc::ptr_eq(&typed, &next) {
                        Arc::clone(slice)
                    } else {
                        next as Slice
                    }
                }
                Err(_) => {
                    tracing::error!(module = %module_name, "state slice has an unexpected type");
                    Arc::clone(slice)
                }
            }
        });

        Self {
            name,
            reducer: erased,
            initial_state: Arc::new(initial_state),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn initial_state(&self) -> Slice {
        Arc::clone(&self.initial_state)
    }

    fn reduce(&self, slice: &Slice, action: &Action) -> Slice {
        (self.reducer)(slice, action)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Immutable view of the whole state tree.
///
/// Cloning is cheap; two snapshots are the same state iff
/// [`ptr_eq`](Self::ptr_eq) holds.
#[derive(Clone, Default)]
pub struct StateSnapshot(Arc<BTreeMap<String, Slice>>);

impl StateSnapshot {
    /// Returns the slice of module `name` if it exists and has type `S`.
    #[must_use]
    pub fn get<S: Any + Send + Sync>(&self, name: &str) -> Option<Arc<S>> {
        self.0
            .get(name)
            .and_then(|slice| Arc::clone(slice).downcast::<S>().ok())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn with_slice(&self, name: &str, slice: Slice) -> Self {
        let mut slices = (*self.0).clone();
        slices.insert(name.to_string(), slice);
        Self(Arc::new(slices))
    }

    pub(crate) fn without_slice(&self, name: &str) -> Self {
        let mut slices = (*self.0).clone();
        slices.remove(name);
        Self(Arc::new(slices))
    }
}

impl fmt::Debug for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Registered modules, combined into one reducer over the state tree.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Module>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module; returns `false` and keeps the existing one on a
    /// duplicate name.
    pub fn insert(&mut self, module: Module) -> bool {
        if self.modules.contains_key(&module.name) {
            return false;
        }
        self.modules.insert(module.name.clone(), module);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Module> {
        self.modules.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Runs every module reducer on its slice.
    ///
    /// Returns `state` itself when no slice changed and the set of slices
    /// already matches the registered modules.
    #[must_use]
    pub fn reduce(&self, state: &StateSnapshot, action: &Action) -> StateSnapshot {
        let mut changed = state.0.len() != self.modules.len();
        let mut next = BTreeMap::new();

        for (name, module) in &self.modules {
            let (previous, missing) = match state.0.get(name) {
                Some(slice) => (Arc::clone(slice), false),
                None => (module.initial_state(), true),
            };
            let reduced = module.reduce(&previous, action);
            changed |= missing || !same_slice(&previous, &reduced);
            next.insert(name.clone(), reduced);
        }

        if changed {
            StateSnapshot(Arc::new(next))
        } else {
            state.clone()
        }
    }
}

fn same_slice(a: &Slice, b: &Slice) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Clones `state`, applies `update`, and returns the original `Arc` when the
/// result is equal to it.
pub fn update_slice<S, F>(state: &Arc<S>, update: F) -> Arc<S>
where
    S: Clone + PartialEq,
    F: FnOnce(&mut S),
{
    let mut next = (**state).clone();
    update(&mut next);
    if next == **state {
        Arc::clone(state)
    } else {
        Arc::new(next)
    }
}
