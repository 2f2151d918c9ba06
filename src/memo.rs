//! Memoization helpers for derived dashboard values.
//!
//! [`Memo`] caches one value keyed by the JSON serialization of its
//! dependencies, for calculations over plain inputs (filters, options).
//! [`memoize_by`] caches a selector over a state slice keyed by the slice's
//! identity, which the store preserves across dispatches that do not touch it.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Single-entry cache keyed by serialized dependencies.
///
/// # Example
///
/// ```
/// use pamdash::memo::Memo;
///
/// let memo = Memo::new();
/// let total = memo.get_or_compute(&("accounts", 2), || 40 + 2);
/// let again = memo.get_or_compute(&("accounts", 2), || unreachable!());
/// assert_eq!((*total, *again), (42, 42));
/// ```
#[derive(Debug)]
pub struct Memo<T> {
    entry: Mutex<Option<(String, Arc<T>)>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }
}

impl<T> Memo<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value when `deps` serialize to the same key as the
    /// last call, otherwise recomputes and caches.
    ///
    /// Dependencies that fail to serialize are never cached.
    pub fn get_or_compute<D, F>(&self, deps: &D, compute: F) -> Arc<T>
    where
        D: Serialize + ?Sized,
        F: FnOnce() -> T,
    {
        let key = match serde_json::to_string(deps) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "memo dependencies are not serializable, skipping cache");
                return Arc::new(compute());
            }
        };

        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_key, value)) = entry.as_ref() {
            if *cached_key == key {
                return Arc::clone(value);
            }
        }

        let value = Arc::new(compute());
        *entry = Some((key, Arc::clone(&value)));
        value
    }

    pub fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Wraps `select` so it only reruns when handed a different slice `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pamdash::memo::memoize_by;
///
/// let row_count = memoize_by(|rows: &Vec<u32>| rows.len());
/// let rows = Arc::new(vec![1, 2, 3]);
/// assert_eq!(*row_count(&rows), 3);
/// ```
pub fn memoize_by<S, T, F>(select: F) -> impl Fn(&Arc<S>) -> Arc<T>
where
    F: Fn(&S) -> T,
{
    let last: Mutex<Option<(Arc<S>, Arc<T>)>> = Mutex::new(None);
    move |input: &Arc<S>| {
        let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_input, output)) = last.as_ref() {
            if Arc::ptr_eq(cached_input, input) {
                return Arc::clone(output);
            }
        }
        let output = Arc::new(select(input));
        *last = Some((Arc::clone(input), Arc::clone(&output)));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn recomputes_only_when_dependencies_change() {
        let memo = Memo::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        memo.get_or_compute(&json!({"platform": "WinDomain"}), compute);
        memo.get_or_compute(&json!({"platform": "WinDomain"}), compute);
        assert_eq!(calls.get(), 1);

        memo.get_or_compute(&json!({"platform": "UnixSSH"}), compute);
        assert_eq!(calls.get(), 2);

        memo.invalidate();
        memo.get_or_compute(&json!({"platform": "UnixSSH"}), compute);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn slice_selector_tracks_identity_not_equality() {
        let calls = Cell::new(0);
        let select = memoize_by(|rows: &Vec<u32>| {
            calls.set(calls.get() + 1);
            rows.iter().sum::<u32>()
        });

        let rows = Arc::new(vec![1, 2]);
        assert_eq!(*select(&rows), 3);
        assert_eq!(*select(&Arc::clone(&rows)), 3);
        assert_eq!(calls.get(), 1);

        assert_eq!(*select(&Arc::new(vec![1, 2])), 3);
        assert_eq!(calls.get(), 2);
    }
}
