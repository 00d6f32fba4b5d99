use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// Identity of one context.
///
/// Values provided under a key are visible to everything rendered inside the
/// [`provide`] call, and to components mounted there even when they later
/// re-render on their own. Two keys never see each other's values, even when
/// they carry the same type.
pub struct ContextKey<T> {
    id: usize,
    label: Rc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    /// Human-readable name of the context.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            label: Rc::clone(&self.label),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextKey")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Create a new context key.
pub fn create_context<T: 'static>(label: impl Into<Rc<str>>) -> ContextKey<T> {
    ContextKey {
        id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
        label: label.into(),
        _marker: PhantomData,
    }
}

struct FrameNode {
    key: usize,
    value: Rc<dyn Any>,
    parent: Frame,
}

/// An immutable chain of provided context values, innermost first.
#[derive(Clone, Default)]
pub(crate) struct Frame(Option<Rc<FrameNode>>);

impl Frame {
    fn push(&self, key: usize, value: Rc<dyn Any>) -> Frame {
        Frame(Some(Rc::new(FrameNode {
            key,
            value,
            parent: self.clone(),
        })))
    }

    fn lookup(&self, key: usize) -> Option<Rc<dyn Any>> {
        let mut node = self.0.as_ref();
        while let Some(frame) = node {
            if frame.key == key {
                return Some(Rc::clone(&frame.value));
            }
            node = frame.parent.0.as_ref();
        }
        None
    }
}

// Thread-local stack of active frames; the top is what `use_context` sees.
thread_local! {
    static FRAME_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// The frame visible at this point of the render.
pub(crate) fn current_frame() -> Frame {
    FRAME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_default())
}

/// Run `f` with `frame` as the visible context chain.
pub(crate) fn enter<F, R>(frame: Frame, f: F) -> R
where
    F: FnOnce() -> R,
{
    FRAME_STACK.with(|stack| {
        stack.borrow_mut().push(frame);
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    FRAME_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// Make `value` visible under `key` for everything rendered inside `f`.
///
/// # Examples
///
/// ```
/// use ctxstore::runtime::{create_context, provide, use_context};
///
/// let theme = create_context::<&'static str>("Theme");
/// assert_eq!(use_context(&theme), None);
///
/// provide(&theme, "dark", || {
///     assert_eq!(use_context(&theme), Some("dark"));
///     provide(&theme, "light", || {
///         assert_eq!(use_context(&theme), Some("light"));
///     });
/// });
/// ```
pub fn provide<T, F, R>(key: &ContextKey<T>, value: T, f: F) -> R
where
    T: 'static,
    F: FnOnce() -> R,
{
    let frame = current_frame().push(key.id, Rc::new(value));
    enter(frame, f)
}

/// Read the innermost value provided under `key`, if any.
pub fn use_context<T: Clone + 'static>(key: &ContextKey<T>) -> Option<T> {
    current_frame()
        .lookup(key.id)
        .and_then(|value| value.downcast_ref::<T>().cloned())
}
