use std::rc::Rc;

use crate::cell::{Shape, StateCell};
use crate::error::Result;
use crate::runtime::{use_sync_external_store, SnapshotFn};

/// Whole-value snapshot that counts every update as a change.
#[derive(Clone)]
struct Versioned<T> {
    version: u64,
    value: T,
}

impl<T> PartialEq for Versioned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

/// Read the whole value, re-rendering on every update of the cell.
pub(crate) fn use_whole<T: Shape>(cell: &StateCell<T>) -> Result<T> {
    let snapshot: SnapshotFn<StateCell<T>, Versioned<T>> = Rc::new(|cell: &StateCell<T>| Versioned {
        version: cell.version(),
        value: cell.get(),
    });
    use_sync_external_store(cell, snapshot, None).map(|snapshot| snapshot.value)
}

/// Read a projection of the value, re-rendering only when the projection changes.
pub(crate) fn use_selected<T, U, F>(
    cell: &StateCell<T>,
    selector: F,
    hydration: Option<Rc<dyn Fn(&T) -> U>>,
) -> Result<U>
where
    T: Shape,
    U: Clone + PartialEq + 'static,
    F: Fn(&T) -> U + 'static,
{
    let snapshot: SnapshotFn<StateCell<T>, U> = Rc::new(move |cell: &StateCell<T>| cell.with(&selector));
    let server = hydration.map(|hydration| -> SnapshotFn<StateCell<T>, U> {
        Rc::new(move |cell: &StateCell<T>| cell.with(|value| hydration(value)))
    });
    use_sync_external_store(cell, snapshot, server)
}
