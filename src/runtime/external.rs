use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::component::{current_component, on_commit, use_hook, RenderMode};
use crate::cell::{Shape, StateCell, Subscription};
use crate::error::{Error, Result};

/// A source that can notify readers of changes.
pub trait ExternalStore: Clone + 'static {
    /// Register `on_change`; dropping the returned guard unregisters it.
    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Subscription;

    /// Stable identity, used to detect that a reader moved to another store.
    fn identity(&self) -> usize;
}

impl<T: Shape> ExternalStore for StateCell<T> {
    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        self.subscribe_rc(on_change)
    }

    fn identity(&self) -> usize {
        StateCell::identity(self)
    }
}

/// Snapshot reader shared between a render and later notifications.
pub type SnapshotFn<S, T> = Rc<dyn Fn(&S) -> T>;

struct ExternalSlot<S, T> {
    store: RefCell<Option<S>>,
    snapshot: RefCell<Option<SnapshotFn<S, T>>>,
    rendered: RefCell<Option<T>>,
    subscription: RefCell<Option<Subscription>>,
    subscribed_to: Cell<Option<usize>>,
}

impl<S, T> ExternalSlot<S, T> {
    fn new() -> Self {
        Self {
            store: RefCell::new(None),
            snapshot: RefCell::new(None),
            rendered: RefCell::new(None),
            subscription: RefCell::new(None),
            subscribed_to: Cell::new(None),
        }
    }
}

impl<S: ExternalStore, T: PartialEq> ExternalSlot<S, T> {
    /// Whether the store's current snapshot differs from the rendered one.
    fn is_stale(&self) -> bool {
        let store = self.store.borrow().clone();
        let snapshot = self.snapshot.borrow().clone();
        let (Some(store), Some(snapshot)) = (store, snapshot) else {
            return false;
        };
        let fresh = snapshot(&store);
        self.rendered.borrow().as_ref() != Some(&fresh)
    }
}

/// Read a snapshot of an external store and re-render on relevant changes.
///
/// The calling component subscribes once its render commits, and
/// re-subscribes if a later render reads from a different store. On every
/// notification the latest `get_snapshot` is evaluated and compared to the
/// value returned by the last render; the component re-renders only when
/// they differ.
///
/// `get_server_snapshot` replaces `get_snapshot` for the first render of a
/// component in a [`Server`](RenderMode::Server) or
/// [`Hydrate`](RenderMode::Hydrate) tree. Server trees never subscribe;
/// hydrating components re-render after commit when the client snapshot
/// disagrees with what the server produced.
pub fn use_sync_external_store<S, T>(
    store: &S,
    get_snapshot: SnapshotFn<S, T>,
    get_server_snapshot: Option<SnapshotFn<S, T>>,
) -> Result<T>
where
    S: ExternalStore,
    T: Clone + PartialEq + 'static,
{
    let owner = current_component().ok_or(Error::OutsideRender {
        operation: "use_sync_external_store",
    })?;
    let slot = use_hook(ExternalSlot::<S, T>::new)?;

    let first = slot.rendered.borrow().is_none();
    // Only a committed subscription counts: a failed render drops its commits.
    let reattach = slot.subscribed_to.get() != Some(store.identity());

    let value = match get_server_snapshot {
        Some(server) if first && owner.mode() != RenderMode::Client => server(store),
        _ => get_snapshot(store),
    };
    *slot.snapshot.borrow_mut() = Some(get_snapshot);
    *slot.store.borrow_mut() = Some(store.clone());
    *slot.rendered.borrow_mut() = Some(value.clone());

    if owner.mode() == RenderMode::Server || !reattach {
        return Ok(value);
    }

    let weak_slot = Rc::downgrade(&slot);
    let weak_owner = owner.downgrade();
    let store = store.clone();
    on_commit(move || {
        let Some(slot) = weak_slot.upgrade() else {
            return;
        };

        let on_change: Rc<dyn Fn()> = {
            let weak_slot = Rc::downgrade(&slot);
            let weak_owner = weak_owner.clone();
            Rc::new(move || {
                let (Some(slot), Some(owner)) = (weak_slot.upgrade(), weak_owner.upgrade()) else {
                    return;
                };
                if slot.is_stale() {
                    owner.schedule();
                }
            })
        };
        // Replacing the guard releases any previous subscription.
        let subscription = store.subscribe(on_change);
        *slot.subscription.borrow_mut() = Some(subscription);
        slot.subscribed_to.set(Some(store.identity()));

        // Catch changes between render and subscribe, and hydration mismatches.
        if slot.is_stale() {
            if let Some(owner) = weak_owner.upgrade() {
                owner.schedule();
            }
        }
    })?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{component, Root};
    use std::cell::Cell;

    fn whole(cell: &StateCell<i32>) -> i32 {
        cell.get()
    }

    #[test]
    fn rerenders_only_when_snapshot_changes() {
        let cell = StateCell::new(0);
        let root = Root::new();

        let source = cell.clone();
        root.render(move || {
            let source = source.clone();
            component("Parity", move || {
                use_sync_external_store::<_, i32>(
                    &source,
                    Rc::new(|c: &StateCell<i32>| c.get() % 2),
                    None,
                )?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

        let reader = root.children()[0].clone();
        assert_eq!(cell.subscriber_count(), 1);

        cell.replace(2);
        assert_eq!(reader.render_count(), 1);
        cell.replace(3);
        assert_eq!(reader.render_count(), 2);
    }

    #[test]
    fn unmount_releases_subscription() {
        let cell = StateCell::new(0);
        let root = Root::new();

        let source = cell.clone();
        root.render(move || {
            let source = source.clone();
            component("Reader", move || {
                use_sync_external_store::<_, i32>(&source, Rc::new(whole), None)?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        assert_eq!(cell.subscriber_count(), 1);

        root.unmount();
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn switching_stores_resubscribes() {
        let first = StateCell::new(1);
        let second = StateCell::new(2);
        let use_second = Rc::new(Cell::new(false));

        let root = Root::new();
        let render = {
            let (first, second, use_second) = (first.clone(), second.clone(), Rc::clone(&use_second));
            move || {
                let source = if use_second.get() { second.clone() } else { first.clone() };
                component("Reader", move || {
                    use_sync_external_store::<_, i32>(&source, Rc::new(whole), None)?;
                    Ok(())
                })?;
                Ok(())
            }
        };

        root.render(render.clone()).unwrap();
        assert_eq!((first.subscriber_count(), second.subscriber_count()), (1, 0));

        use_second.set(true);
        root.render(render).unwrap();
        assert_eq!((first.subscriber_count(), second.subscriber_count()), (0, 1));
    }

    #[test]
    fn reader_recovering_from_failed_render_subscribes() {
        let cell = StateCell::new(0);
        let root = Root::new();
        let fail = Rc::new(Cell::new(true));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (source, failing, sink) = (cell.clone(), Rc::clone(&fail), Rc::clone(&seen));
        let render = move || {
            let (source, failing, sink) = (source.clone(), Rc::clone(&failing), Rc::clone(&sink));
            component("Reader", move || {
                let value = use_sync_external_store::<_, i32>(&source, Rc::new(whole), None)?;
                sink.borrow_mut().push(value);
                if failing.get() {
                    return Err(Error::OutsideRender { operation: "load" });
                }
                Ok(())
            })?;
            Ok(())
        };

        assert!(root.render(render.clone()).is_err());
        assert_eq!(cell.subscriber_count(), 0);

        fail.set(false);
        root.render(render).unwrap();
        assert_eq!(cell.subscriber_count(), 1);

        cell.replace(7);
        assert_eq!(seen.borrow().last(), Some(&7));
    }

    #[test]
    fn server_mode_never_subscribes() {
        let cell = StateCell::new(5);
        let root = Root::with_mode(RenderMode::Server);
        let seen = Rc::new(Cell::new(0));

        let (source, sink) = (cell.clone(), Rc::clone(&seen));
        root.render(move || {
            let (source, sink) = (source.clone(), Rc::clone(&sink));
            component("Page", move || {
                let value = use_sync_external_store::<_, i32>(
                    &source,
                    Rc::new(whole),
                    Some(Rc::new(|_: &StateCell<i32>| -1)),
                )?;
                sink.set(value);
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.get(), -1);
        assert_eq!(cell.subscriber_count(), 0);
    }
}
