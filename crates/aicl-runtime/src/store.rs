//! Shared data store.
//!
//! One cell per `DATA` declaration, created at program load. The set of
//! cell names is immutable afterwards; values are mutated through each
//! cell's own lock, held only long enough to copy a value in or out.

use aicl_ast::{DataDecl, SmolStr};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map as JsonMap, Value};
use std::sync::Arc;

/// A named, typed, mutable slot in the data store.
#[derive(Debug)]
pub struct DataCell {
    name: SmolStr,
    ty: SmolStr,
    value: Mutex<String>,
}

impl DataCell {
    fn new(name: SmolStr, ty: SmolStr, initial: String) -> Self {
        Self {
            name,
            ty,
            value: Mutex::new(initial),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type tag ("String", "Int", ...). Informational only;
    /// values are propagated as text.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Copy the current value out.
    pub fn get(&self) -> String {
        self.value.lock().clone()
    }

    /// Replace the current value.
    pub fn set(&self, value: String) {
        *self.value.lock() = value;
    }
}

/// The per-run data store. Cheap to share across workers; all interior
/// mutability lives in the cells.
#[derive(Debug, Default)]
pub struct DataStore {
    cells: IndexMap<SmolStr, Arc<DataCell>>,
}

impl DataStore {
    /// Build the store from a program's global declarations. Cells with no
    /// declared initial value start empty.
    pub fn from_globals(globals: &IndexMap<SmolStr, DataDecl>) -> Self {
        let cells = globals
            .values()
            .map(|decl| {
                let initial = decl.initial.as_deref().unwrap_or("").to_string();
                (
                    decl.name.clone(),
                    Arc::new(DataCell::new(decl.name.clone(), decl.ty.clone(), initial)),
                )
            })
            .collect();
        Self { cells }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn cell(&self, name: &str) -> Option<&Arc<DataCell>> {
        self.cells.get(name)
    }

    /// Copy out the value of a cell, if it exists.
    pub fn read(&self, name: &str) -> Option<String> {
        self.cells.get(name).map(|cell| cell.get())
    }

    /// Set a cell's value. Returns false when the name is unknown.
    #[must_use]
    pub fn write(&self, name: &str, value: String) -> bool {
        match self.cells.get(name) {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    /// Snapshot every cell as a JSON object, in declaration order.
    pub fn snapshot(&self) -> JsonMap<String, Value> {
        self.filtered_snapshot(|_| true)
    }

    /// Snapshot the cells whose names pass the filter, in declaration
    /// order. Each cell's lock is taken individually, so the snapshot is
    /// consistent per cell but not across cells.
    pub fn filtered_snapshot<F>(&self, mut keep: F) -> JsonMap<String, Value>
    where
        F: FnMut(&str) -> bool,
    {
        self.cells
            .values()
            .filter(|cell| keep(cell.name()))
            .map(|cell| (cell.name().to_string(), Value::String(cell.get())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn store_with(entries: &[(&str, &str, &str)]) -> DataStore {
        let globals: IndexMap<SmolStr, DataDecl> = entries
            .iter()
            .map(|(name, ty, initial)| {
                (
                    SmolStr::new(name),
                    DataDecl {
                        name: SmolStr::new(name),
                        ty: SmolStr::new(ty),
                        initial: if initial.is_empty() {
                            None
                        } else {
                            Some(SmolStr::new(initial))
                        },
                    },
                )
            })
            .collect();
        DataStore::from_globals(&globals)
    }

    #[test]
    fn test_initial_values() {
        let store = store_with(&[("origin", "String", "Chicago"), ("flightInfo", "String", "")]);
        assert_eq!(store.read("origin"), Some("Chicago".to_string()));
        assert_eq!(store.read("flightInfo"), Some(String::new()));
        assert_eq!(store.read("missing"), None);
    }

    #[test]
    fn test_write_known_and_unknown() {
        let store = store_with(&[("x", "String", "")]);
        assert!(store.write("x", "updated".into()));
        assert_eq!(store.read("x"), Some("updated".to_string()));
        assert!(!store.write("y", "lost".into()));
    }

    #[test]
    fn test_snapshot_order_matches_declaration() {
        let store = store_with(&[("b", "String", "2"), ("a", "String", "1")]);
        let keys: Vec<_> = store.snapshot().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_filtered_snapshot() {
        let store = store_with(&[("seen", "String", "yes"), ("hidden", "String", "no")]);
        let snapshot = store.filtered_snapshot(|name| name == "seen");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["seen"], Value::String("yes".into()));
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let store = Arc::new(store_with(&[("cell", "String", "")]));
        let a = "a".repeat(1024);
        let b = "b".repeat(1024);

        let handles: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(store.write("cell", value.clone()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = store.read("cell").unwrap();
        assert!(last == a || last == b, "torn write observed");
    }
}
