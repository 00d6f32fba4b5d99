use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::shape::Shape;

type Callback = Rc<dyn Fn()>;

/// A requested change to a [`StateCell`].
pub enum Update<T: Shape> {
    /// Replace the value wholesale.
    Replace(T),
    /// Shallow-merge a patch into the value. Non-keyed values are replaced.
    Merge(T::Patch),
    /// Compute the next value from the previous one.
    Apply(Box<dyn FnOnce(&T) -> T>),
}

impl<T: Shape> Update<T> {
    /// Build an [`Update::Apply`] from a closure.
    pub fn apply(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Update::Apply(Box::new(f))
    }
}

impl<T: Shape> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Update::Replace(_) => "Replace",
            Update::Merge(_) => "Merge",
            Update::Apply(_) => "Apply",
        };
        f.debug_tuple("Update").field(&kind).finish()
    }
}

/// Identity-keyed callback registry shared by a cell and its subscriptions.
#[derive(Default)]
struct Subscribers {
    next_id: Cell<u64>,
    entries: RefCell<HashMap<u64, Callback>>,
}

impl Subscribers {
    fn insert(&self, callback: Callback) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().insert(id, callback);
        id
    }

    fn remove(&self, id: u64) {
        self.entries.borrow_mut().remove(&id);
    }

    fn snapshot(&self) -> Vec<Callback> {
        self.entries.borrow().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// RAII guard for a cell subscription.
///
/// Dropping the guard unsubscribes. [`unsubscribe`](Subscription::unsubscribe)
/// may be called any number of times; only the first call has an effect.
pub struct Subscription {
    id: u64,
    registry: Weak<Subscribers>,
    active: Cell<bool>,
}

impl Subscription {
    /// Remove the callback from the cell.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
            tracing::trace!(subscription = self.id, "unsubscribed");
        }
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.active.get() && self.registry.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

struct CellInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: Rc<Subscribers>,
    label: Option<Rc<str>>,
}

/// A mutable value with a set of change subscribers.
///
/// Cells are single-threaded: the handle is an `Rc`, and cloning it shares
/// the same value and subscribers. Every [`set`](StateCell::set) is visible to
/// the next [`get`](StateCell::get), and all subscribers registered when
/// notification starts have been called once by the time `set` returns.
pub struct StateCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T: Shape> StateCell<T> {
    /// Create a new cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::with_label(initial, None)
    }

    pub(crate) fn with_label(initial: T, label: Option<Rc<str>>) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(initial),
                version: Cell::new(0),
                subscribers: Rc::new(Subscribers::default()),
                label,
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the value without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let value = self.inner.value.borrow();
        f(&value)
    }

    /// Number of updates applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Apply an update and notify every subscriber.
    pub fn set(&self, update: Update<T>) {
        match update {
            Update::Replace(next) => {
                *self.inner.value.borrow_mut() = next;
            }
            Update::Merge(patch) => {
                let mut value = self.inner.value.borrow_mut();
                if !value.is_keyed() {
                    tracing::trace!(cell = self.label(), "patch on non-keyed value replaces it");
                }
                value.merge(patch);
            }
            Update::Apply(f) => {
                // The update function may read this cell, so the shared
                // borrow ends before the value is written.
                let next = {
                    let prev = self.inner.value.borrow();
                    f(&prev)
                };
                *self.inner.value.borrow_mut() = next;
            }
        }
        self.bump_and_notify();
    }

    /// Replace the value wholesale.
    pub fn replace(&self, value: T) {
        self.set(Update::Replace(value));
    }

    /// Shallow-merge a patch into the value.
    pub fn merge(&self, patch: T::Patch) {
        self.set(Update::Merge(patch));
    }

    /// Compute the next value from the previous one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.set(Update::apply(f));
    }

    /// Merge a complete value of the same shape (see [`Shape::absorb`])
    /// without notifying. Subscribers hear of it on the next [`notify`](Self::notify).
    pub(crate) fn absorb_quietly(&self, full: T) {
        self.inner.value.borrow_mut().absorb(full);
        self.bump();
    }

    fn bump_and_notify(&self) {
        self.bump();
        self.notify();
    }

    fn bump(&self) {
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        tracing::trace!(cell = self.label(), version, "cell updated");
    }

    pub(crate) fn notify(&self) {
        // Callbacks may subscribe or unsubscribe while running, so iterate a copy.
        for callback in self.inner.subscribers.snapshot() {
            callback();
        }
    }

    /// Subscribe to changes.
    ///
    /// The callback receives no arguments; read the cell to see the new value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.subscribe_rc(Rc::new(callback))
    }

    pub(crate) fn subscribe_rc(&self, callback: Rc<dyn Fn()>) -> Subscription {
        let id = self.inner.subscribers.insert(callback);
        tracing::trace!(cell = self.label(), subscription = id, "subscribed");
        Subscription {
            id,
            registry: Rc::downgrade(&self.inner.subscribers),
            active: Cell::new(true),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T> StateCell<T> {
    /// Whether two handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Diagnostic label, if any.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("label", &self.inner.label)
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}
