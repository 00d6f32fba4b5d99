use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::hooks::{use_selected, use_whole};
use crate::cell::{Shape, StateCell};
use crate::error::{Error, Result};
use crate::runtime::{
    create_context, keep_children, keyed_component, provide, use_context, use_hook, Children,
    Component, ContextKey,
};

/// Props of a [`StatePublisher`] wrapper.
pub struct PublisherProps<T> {
    value: T,
    children: Children,
    stable_children: bool,
}

impl<T> PublisherProps<T> {
    /// Publish `value` to `children`.
    pub fn new(value: T, children: Children) -> Self {
        Self {
            value,
            children,
            stable_children: false,
        }
    }

    /// Render `children` once and never again from this wrapper.
    ///
    /// **Escape hatch.** With this set, the wrapper renders its children on
    /// mount and afterwards keeps the mounted subtree as is, even when it
    /// is given a different `children` function. Published values still reach
    /// the subtree through its readers, which re-render on their own. If the
    /// subtree's structure does depend on anything but the published value,
    /// it goes stale: setting this flag asserts that it does not.
    pub fn stable_children(mut self, stable: bool) -> Self {
        self.stable_children = stable;
        self
    }
}

struct PublisherDef<T> {
    initial: T,
    name: Rc<str>,
    values: ContextKey<StateCell<T>>,
}

/// A read-only context fed by the props of its wrapper.
///
/// Descendants read the published value with [`use_shared_value`] or a
/// selector hook. There is no way to write from below: the only writer is
/// the wrapper, whenever it renders with a different value.
///
/// [`use_shared_value`]: StatePublisher::use_shared_value
pub struct StatePublisher<T> {
    inner: Rc<PublisherDef<T>>,
}

/// Create a publisher whose wrapper starts from `initial`.
///
/// `initial` is only visible until the wrapper applies its first props,
/// which happens before any child renders.
pub fn create_state_publisher<T>(initial: T, debug_name: Option<&str>) -> StatePublisher<T>
where
    T: Shape + PartialEq,
{
    let name: Rc<str> = Rc::from(debug_name.unwrap_or("StatePublisher"));
    StatePublisher {
        inner: Rc::new(PublisherDef {
            initial,
            values: create_context(format!("{name}.Value")),
            name,
        }),
    }
}

impl<T: Shape + PartialEq> StatePublisher<T> {
    /// Name used in diagnostics.
    pub fn debug_name(&self) -> &str {
        &self.inner.name
    }

    /// Mount (or re-render) the wrapper with `props`.
    ///
    /// When `props.value` differs from the value applied on the previous
    /// render, it is absorbed into the published state before the children
    /// render. Readers the children did not render again are notified once
    /// the children are done, so each reader renders at most once per change.
    pub fn wrapper(&self, props: PublisherProps<T>) -> Result<Component> {
        let def = Rc::clone(&self.inner);
        keyed_component(format!("{}.Wrapper", def.name), def.values.id(), move || {
            let cell = use_hook(|| {
                tracing::debug!(publisher = %def.name, "publisher created");
                StateCell::with_label(def.initial.clone(), Some(Rc::clone(&def.name)))
            })?;
            let applied = use_hook(|| RefCell::new(None::<T>))?;
            let rendered = use_hook(|| RefCell::new(None::<Children>))?;

            let changed = applied.borrow().as_ref() != Some(&props.value);
            if changed {
                *applied.borrow_mut() = Some(props.value.clone());
                cell.absorb_quietly(props.value.clone());
            }

            let reuse = match rendered.borrow().as_ref() {
                Some(previous) => props.stable_children || Rc::ptr_eq(previous, &props.children),
                None => false,
            };

            let result = provide(&def.values, (*cell).clone(), || {
                if reuse {
                    keep_children()
                } else {
                    *rendered.borrow_mut() = Some(Rc::clone(&props.children));
                    (props.children)()
                }
            });

            // Readers rendered above already hold the new value and skip this.
            if changed {
                cell.notify();
            }
            result
        })
    }

    /// Read the whole published value; re-renders on every publish.
    pub fn use_shared_value(&self) -> Result<T> {
        let cell = self.cell("use_shared_value")?;
        use_whole(&cell)
    }

    /// Read `selector(value)`; re-renders only when that output changes.
    pub fn use_shared_selector<U, F>(&self, selector: F) -> Result<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let cell = self.cell("use_shared_selector")?;
        use_selected(&cell, selector, None)
    }

    /// Like [`use_shared_selector`](Self::use_shared_selector), but the first
    /// server or hydration render reads `hydration(value)` instead.
    pub fn use_shared_selector_hydrated<U, F, H>(&self, selector: F, hydration: H) -> Result<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
        H: Fn(&T) -> U + 'static,
    {
        let cell = self.cell("use_shared_selector_hydrated")?;
        let hydration: Rc<dyn Fn(&T) -> U> = Rc::new(hydration);
        use_selected(&cell, selector, Some(hydration))
    }

    fn cell(&self, hook: &'static str) -> Result<StateCell<T>> {
        use_context(&self.inner.values).ok_or_else(|| Error::MissingWrapper {
            hook,
            store: self.inner.name.to_string(),
        })
    }
}

impl<T> Clone for StatePublisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StatePublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatePublisher")
            .field("name", &self.inner.name)
            .finish()
    }
}
