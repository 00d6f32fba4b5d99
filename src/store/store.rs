use std::fmt;
use std::rc::Rc;

use super::hooks::{use_selected, use_whole};
use crate::cell::{Shape, StateCell, Update};
use crate::error::{Error, Result};
use crate::runtime::{
    create_context, keyed_component, provide, use_context, use_hook, Children, Component,
    ContextKey,
};

/// Write surface of a [`ContextStore`].
///
/// One dispatch exists per mounted wrapper and it never changes, so
/// components that only write never re-render because of the value.
pub struct Dispatch<T> {
    cell: StateCell<T>,
}

impl<T: Shape> Dispatch<T> {
    /// Apply an update to the store.
    pub fn set(&self, update: Update<T>) {
        self.cell.set(update);
    }

    /// Replace the value wholesale.
    pub fn replace(&self, value: T) {
        self.cell.replace(value);
    }

    /// Shallow-merge a patch into the value.
    pub fn merge(&self, patch: T::Patch) {
        self.cell.merge(patch);
    }

    /// Compute the next value from the previous one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.cell.update(f);
    }
}

impl<T> Dispatch<T> {
    /// Whether both handles dispatch to the same mounted store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl<T> Clone for Dispatch<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Dispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("store", &self.cell.label())
            .finish()
    }
}

struct StoreDef<T> {
    initial: T,
    name: Rc<str>,
    values: ContextKey<StateCell<T>>,
    dispatch: ContextKey<Dispatch<T>>,
}

/// A state container scoped to the subtree of its wrapper.
///
/// Reads and writes travel through two separate contexts. Readers subscribe
/// to the value and re-render when what they read changes; writers only take
/// the dispatch, which is stable for the lifetime of the wrapper.
///
/// # Examples
///
/// ```
/// use ctxstore::{children, component, create_context_store, Root};
///
/// let counter = create_context_store(0i64, Some("Counter"));
/// let root = Root::new();
///
/// let store = counter.clone();
/// root.render(move || {
///     let store = store.clone();
///     counter_tree(&store)
/// })
/// .unwrap();
///
/// fn counter_tree(store: &ctxstore::ContextStore<i64>) -> ctxstore::Result<()> {
///     let reader = store.clone();
///     let writer = store.clone();
///     store.wrapper(children(move || {
///         let reader = reader.clone();
///         component("Display", move || {
///             let _count = reader.use_store_value()?;
///             Ok(())
///         })?;
///         let writer = writer.clone();
///         component("Increment", move || {
///             let dispatch = writer.use_store_dispatch()?;
///             dispatch.update(|n| n + 1);
///             Ok(())
///         })?;
///         Ok(())
///     }))?;
///     Ok(())
/// }
/// ```
pub struct ContextStore<T> {
    inner: Rc<StoreDef<T>>,
}

/// Create a scoped store holding `initial` in every mounted wrapper.
///
/// `debug_name` only appears in diagnostics: component names, log events and
/// error messages.
pub fn create_context_store<T: Shape>(initial: T, debug_name: Option<&str>) -> ContextStore<T> {
    let name: Rc<str> = Rc::from(debug_name.unwrap_or("ContextStore"));
    ContextStore {
        inner: Rc::new(StoreDef {
            initial,
            values: create_context(format!("{name}.Value")),
            dispatch: create_context(format!("{name}.Dispatch")),
            name,
        }),
    }
}

impl<T: Shape> ContextStore<T> {
    /// Name used in diagnostics.
    pub fn debug_name(&self) -> &str {
        &self.inner.name
    }

    /// Mount the wrapper that owns one store instance for `children`.
    ///
    /// The store is created on the wrapper's first render and lives until
    /// it unmounts. Re-rendering the wrapper keeps the current value.
    pub fn wrapper(&self, children: Children) -> Result<Component> {
        let def = Rc::clone(&self.inner);
        keyed_component(format!("{}.Wrapper", def.name), def.values.id(), move || {
            let cell = use_hook(|| {
                tracing::debug!(store = %def.name, "store created");
                StateCell::with_label(def.initial.clone(), Some(Rc::clone(&def.name)))
            })?;
            let dispatch = use_hook(|| Dispatch {
                cell: (*cell).clone(),
            })?;

            provide(&def.values, (*cell).clone(), || {
                provide(&def.dispatch, (*dispatch).clone(), || children())
            })
        })
    }

    /// Read the whole value; re-renders on every update.
    pub fn use_store_value(&self) -> Result<T> {
        let cell = self.cell("use_store_value")?;
        use_whole(&cell)
    }

    /// Read `selector(value)`; re-renders only when that output changes.
    pub fn use_store_selector<U, F>(&self, selector: F) -> Result<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let cell = self.cell("use_store_selector")?;
        use_selected(&cell, selector, None)
    }

    /// Like [`use_store_selector`](Self::use_store_selector), but the first
    /// server or hydration render reads `hydration(value)` instead.
    pub fn use_store_selector_hydrated<U, F, H>(&self, selector: F, hydration: H) -> Result<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
        H: Fn(&T) -> U + 'static,
    {
        let cell = self.cell("use_store_selector_hydrated")?;
        let hydration: Rc<dyn Fn(&T) -> U> = Rc::new(hydration);
        use_selected(&cell, selector, Some(hydration))
    }

    /// Take the store's dispatch without subscribing to its value.
    pub fn use_store_dispatch(&self) -> Result<Dispatch<T>> {
        use_context(&self.inner.dispatch).ok_or_else(|| self.missing("use_store_dispatch"))
    }

    fn cell(&self, hook: &'static str) -> Result<StateCell<T>> {
        use_context(&self.inner.values).ok_or_else(|| self.missing(hook))
    }

    fn missing(&self, hook: &'static str) -> Error {
        Error::MissingWrapper {
            hook,
            store: self.inner.name.to_string(),
        }
    }
}

impl<T> Clone for ContextStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ContextStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore")
            .field("name", &self.inner.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{children, component, Root};
    use std::cell::RefCell;

    #[derive(Clone, Debug, PartialEq)]
    struct Form {
        name: String,
        age: u32,
    }

    #[derive(Default)]
    struct FormPatch {
        name: Option<String>,
        age: Option<u32>,
    }

    impl Shape for Form {
        type Patch = FormPatch;

        fn merge(&mut self, patch: FormPatch) {
            if let Some(name) = patch.name {
                self.name = name;
            }
            if let Some(age) = patch.age {
                self.age = age;
            }
        }

        fn is_keyed(&self) -> bool {
            true
        }
    }

    fn form() -> Form {
        Form {
            name: "ada".to_string(),
            age: 36,
        }
    }

    #[test]
    fn hooks_outside_wrapper_fail() {
        let store = create_context_store(form(), Some("Form"));

        assert_eq!(
            store.use_store_value(),
            Err(Error::MissingWrapper {
                hook: "use_store_value",
                store: "Form".to_string(),
            })
        );
        assert!(matches!(
            store.use_store_dispatch(),
            Err(Error::MissingWrapper { hook: "use_store_dispatch", .. })
        ));
    }

    #[test]
    fn missing_wrapper_message_names_the_store() {
        let store = create_context_store(0u8, None);
        let error = store.use_store_selector(|n| *n).unwrap_err();
        assert_eq!(
            error.to_string(),
            "`use_store_selector` must be used inside ContextStore.Wrapper"
        );
    }

    #[test]
    fn partial_updates_merge_through_dispatch() {
        let store = create_context_store(form(), Some("Form"));
        let root = Root::new();
        let captured: Rc<RefCell<Option<Dispatch<Form>>>> = Rc::new(RefCell::new(None));
        let names = Rc::new(RefCell::new(Vec::new()));

        let (outer, sink, seen) = (store.clone(), Rc::clone(&captured), Rc::clone(&names));
        root.render(move || {
            let (reader, writer, sink, seen) = (outer.clone(), outer.clone(), Rc::clone(&sink), Rc::clone(&seen));
            outer.wrapper(children(move || {
                let reader = reader.clone();
                let seen = Rc::clone(&seen);
                component("Name", move || {
                    let name = reader.use_store_selector(|form: &Form| form.name.clone())?;
                    seen.borrow_mut().push(name);
                    Ok(())
                })?;
                let (writer, sink) = (writer.clone(), Rc::clone(&sink));
                component("Controls", move || {
                    *sink.borrow_mut() = Some(writer.use_store_dispatch()?);
                    Ok(())
                })?;
                Ok(())
            }))?;
            Ok(())
        })
        .unwrap();

        let dispatch = captured.borrow().clone().unwrap();
        dispatch.merge(FormPatch {
            age: Some(37),
            ..Default::default()
        });
        dispatch.merge(FormPatch {
            name: Some("grace".to_string()),
            ..Default::default()
        });

        assert_eq!(*names.borrow(), vec!["ada".to_string(), "grace".to_string()]);
    }

    #[test]
    fn each_wrapper_mount_owns_its_own_state() {
        let store = create_context_store(0u32, Some("Pair"));
        let root = Root::new();
        let dispatches: Rc<RefCell<Vec<Dispatch<u32>>>> = Rc::new(RefCell::new(Vec::new()));
        let values = Rc::new(RefCell::new(Vec::new()));

        let (outer, sink, seen) = (store.clone(), Rc::clone(&dispatches), Rc::clone(&values));
        root.render(move || {
            for _ in 0..2 {
                let (reader, sink, seen) = (outer.clone(), Rc::clone(&sink), Rc::clone(&seen));
                outer.wrapper(children(move || {
                    let (reader, sink, seen) = (reader.clone(), Rc::clone(&sink), Rc::clone(&seen));
                    component("Leaf", move || {
                        sink.borrow_mut().push(reader.use_store_dispatch()?);
                        seen.borrow_mut().push(reader.use_store_value()?);
                        Ok(())
                    })?;
                    Ok(())
                }))?;
            }
            Ok(())
        })
        .unwrap();

        let (first, second) = {
            let dispatches = dispatches.borrow();
            (dispatches[0].clone(), dispatches[1].clone())
        };
        assert!(!first.ptr_eq(&second));

        first.replace(5);
        assert_eq!(values.borrow().last(), Some(&5));
        assert_eq!(values.borrow().len(), 3);
    }

    #[test]
    fn stores_sharing_a_name_do_not_share_state() {
        let first = create_context_store(1, None);
        let second = create_context_store(100, None);
        let use_second = Rc::new(std::cell::Cell::new(false));
        let root = Root::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (a, b, pick, sink) = (first.clone(), second.clone(), Rc::clone(&use_second), Rc::clone(&seen));
        let render = move || {
            let store = if pick.get() { b.clone() } else { a.clone() };
            let (reader, sink) = (store.clone(), Rc::clone(&sink));
            store.wrapper(children(move || {
                let (reader, sink) = (reader.clone(), Rc::clone(&sink));
                component("Reader", move || {
                    sink.borrow_mut().push(reader.use_store_value()?);
                    Ok(())
                })?;
                Ok(())
            }))?;
            Ok(())
        };

        root.render(render.clone()).unwrap();
        let wrapper = root.children()[0].clone();

        use_second.set(true);
        root.render(render).unwrap();

        assert_eq!(*seen.borrow(), vec![1, 100]);
        assert!(!wrapper.is_mounted());
        assert_eq!(root.children()[0].name(), "ContextStore.Wrapper");
    }
}
