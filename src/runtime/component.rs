use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::{self, Frame};
use crate::error::{Error, Result};

type RenderFn = Rc<dyn Fn() -> Result<()>>;

/// A render function for a subtree, shared so wrappers can tell whether it changed.
pub type Children = Rc<dyn Fn() -> Result<()>>;

/// Wrap a closure as [`Children`].
pub fn children<F>(render: F) -> Children
where
    F: Fn() -> Result<()> + 'static,
{
    Rc::new(render)
}

/// How a root produces its first output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Regular interactive rendering.
    #[default]
    Client,
    /// One-shot rendering of server output: server snapshots, no subscriptions.
    Server,
    /// First render reproduces server output, then switches to client snapshots.
    Hydrate,
}

pub(crate) struct ComponentInner {
    name: Cow<'static, str>,
    key: Option<usize>,
    render: RefCell<RenderFn>,
    frame: RefCell<Frame>,
    mode: Cell<RenderMode>,
    renders: Cell<usize>,
    hooks: RefCell<Vec<Rc<dyn Any>>>,
    hook_cursor: Cell<usize>,
    children: RefCell<Vec<Component>>,
    child_cursor: Cell<usize>,
    commits: RefCell<Vec<Box<dyn FnOnce()>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    mounted: Cell<bool>,
    rendering: Cell<bool>,
    pending: Cell<bool>,
}

/// Handle to a mounted component instance.
///
/// A component owns its hook state and its children. It renders when its
/// parent renders it, and on its own when [`rerender`](Component::rerender)
/// is called, typically by a store subscription.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Weak handle used by subscriptions so they never keep a component alive.
#[derive(Clone)]
pub(crate) struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub(crate) fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

thread_local! {
    static RENDER_STACK: RefCell<Vec<Component>> = const { RefCell::new(Vec::new()) };
}

fn with_rendering<F, R>(component: &Component, f: F) -> R
where
    F: FnOnce() -> R,
{
    RENDER_STACK.with(|stack| {
        stack.borrow_mut().push(component.clone());
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    RENDER_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// The component currently rendering, if any.
pub fn current_component() -> Option<Component> {
    RENDER_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Holds `rendering` set for one pass, clearing it even if the render panics.
struct RenderPass<'a>(&'a Cell<bool>);

impl<'a> RenderPass<'a> {
    fn begin(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn rendering(operation: &'static str) -> Result<Component> {
    current_component().ok_or(Error::OutsideRender { operation })
}

impl Component {
    pub(crate) fn new_root(name: impl Into<Cow<'static, str>>, mode: RenderMode) -> Self {
        Self::create(name.into(), None, Rc::new(|| Ok(())), Frame::default(), mode)
    }

    fn create(
        name: Cow<'static, str>,
        key: Option<usize>,
        render: RenderFn,
        frame: Frame,
        mode: RenderMode,
    ) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                name,
                key,
                render: RefCell::new(render),
                frame: RefCell::new(frame),
                mode: Cell::new(mode),
                renders: Cell::new(0),
                hooks: RefCell::new(Vec::new()),
                hook_cursor: Cell::new(0),
                children: RefCell::new(Vec::new()),
                child_cursor: Cell::new(0),
                commits: RefCell::new(Vec::new()),
                cleanups: RefCell::new(Vec::new()),
                mounted: Cell::new(false),
                rendering: Cell::new(false),
                pending: Cell::new(false),
            }),
        }
    }

    /// Name given at mount.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// How many times this instance has rendered.
    pub fn render_count(&self) -> usize {
        self.inner.renders.get()
    }

    /// Whether the instance is still part of a live tree.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Render mode in effect for this instance's next render.
    pub fn mode(&self) -> RenderMode {
        self.inner.mode.get()
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Children mounted during the last render, in order.
    pub fn children(&self) -> Vec<Component> {
        self.inner.children.borrow().clone()
    }

    pub(crate) fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.inner))
    }

    pub(crate) fn set_render(&self, render: RenderFn) {
        *self.inner.render.borrow_mut() = render;
    }

    /// Render this instance again in place.
    ///
    /// A request made while the instance is already rendering is folded into
    /// one extra pass after the current one. Unmounted instances are skipped.
    pub fn rerender(&self) -> Result<()> {
        if !self.is_mounted() && !self.inner.rendering.get() {
            return Ok(());
        }
        self.run()
    }

    /// Re-render on behalf of a change notification, where nobody can
    /// receive the error.
    pub(crate) fn schedule(&self) {
        if let Err(error) = self.rerender() {
            tracing::error!(component = %self.name(), %error, "re-render failed");
        }
    }

    pub(crate) fn run(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.rendering.get() {
            inner.pending.set(true);
            return Ok(());
        }

        loop {
            let pass = RenderPass::begin(&inner.rendering);
            inner.pending.set(false);
            inner.hook_cursor.set(0);
            inner.child_cursor.set(0);
            inner.renders.set(inner.renders.get() + 1);

            let render = Rc::clone(&inner.render.borrow());
            let frame = inner.frame.borrow().clone();
            let result = with_rendering(self, || context::enter(frame, || render()));
            drop(pass);

            if let Err(error) = result {
                inner.commits.borrow_mut().clear();
                return Err(error);
            }

            let stale = {
                let mut children = inner.children.borrow_mut();
                let keep = inner.child_cursor.get().min(children.len());
                children.split_off(keep)
            };
            for child in stale {
                child.unmount();
            }

            if !inner.pending.get() {
                break;
            }
        }

        if !inner.mounted.replace(true) {
            tracing::debug!(component = %inner.name, "mounted");
        }
        if inner.mode.get() == RenderMode::Hydrate {
            inner.mode.set(RenderMode::Client);
        }

        let commits = std::mem::take(&mut *inner.commits.borrow_mut());
        for commit in commits {
            commit();
        }
        Ok(())
    }

    /// Tear down this instance and its subtree.
    pub(crate) fn unmount(&self) {
        let inner = &self.inner;
        let children = std::mem::take(&mut *inner.children.borrow_mut());
        for child in children.into_iter().rev() {
            child.unmount();
        }

        let cleanups = std::mem::take(&mut *inner.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        inner.hooks.borrow_mut().clear();
        inner.commits.borrow_mut().clear();

        if inner.mounted.replace(false) {
            tracing::debug!(component = %inner.name, "unmounted");
        }
    }

    fn next_hook<T: 'static>(&self, init: impl FnOnce() -> T) -> Result<Rc<T>> {
        let inner = &self.inner;
        let index = inner.hook_cursor.get();
        inner.hook_cursor.set(index + 1);

        let existing = inner.hooks.borrow().get(index).cloned();
        match existing {
            Some(slot) => slot.downcast::<T>().map_err(|_| Error::HookMismatch {
                component: inner.name.to_string(),
                index,
            }),
            None => {
                let slot = Rc::new(init());
                inner.hooks.borrow_mut().push(Rc::clone(&slot) as Rc<dyn Any>);
                Ok(slot)
            }
        }
    }

    fn mount_child(
        &self,
        name: Cow<'static, str>,
        key: Option<usize>,
        render: RenderFn,
    ) -> Result<Component> {
        let inner = &self.inner;
        let index = inner.child_cursor.get();
        inner.child_cursor.set(index + 1);

        let frame = context::current_frame();
        let existing = inner.children.borrow().get(index).cloned();
        let child = match existing {
            Some(child) if child.inner.name == name && child.inner.key == key => {
                child.set_render(render);
                *child.inner.frame.borrow_mut() = frame;
                child
            }
            existing => {
                let child = Component::create(name, key, render, frame, inner.mode.get());
                let mut children = inner.children.borrow_mut();
                if existing.is_some() {
                    let replaced = std::mem::replace(&mut children[index], child.clone());
                    drop(children);
                    replaced.unmount();
                } else {
                    children.push(child.clone());
                }
                child
            }
        };

        child.run()?;
        Ok(child)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("renders", &self.inner.renders.get())
            .field("mounted", &self.inner.mounted.get())
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

/// Render a child component at the current position.
///
/// When the previous render of the parent placed a component with the same
/// name at this position, that instance (and its hook state) is reused and
/// rendered with the new `render` function. Otherwise a fresh instance is
/// mounted.
pub fn component<F>(name: impl Into<Cow<'static, str>>, render: F) -> Result<Component>
where
    F: Fn() -> Result<()> + 'static,
{
    let parent = rendering("component")?;
    parent.mount_child(name.into(), None, Rc::new(render))
}

/// Like [`component`], but an instance is only reused when it was mounted
/// with the same `key` as well as the same name.
pub(crate) fn keyed_component<F>(
    name: impl Into<Cow<'static, str>>,
    key: usize,
    render: F,
) -> Result<Component>
where
    F: Fn() -> Result<()> + 'static,
{
    let parent = rendering("component")?;
    parent.mount_child(name.into(), Some(key), Rc::new(render))
}

/// Keep the current component's remaining children as they are.
///
/// Children already mounted past this point are neither re-rendered nor
/// unmounted by the current render.
pub fn keep_children() -> Result<()> {
    let current = rendering("keep_children")?;
    let len = current.inner.children.borrow().len();
    current.inner.child_cursor.set(len);
    Ok(())
}

/// Per-instance state that survives re-renders, keyed by call order.
pub fn use_hook<T: 'static>(init: impl FnOnce() -> T) -> Result<Rc<T>> {
    rendering("use_hook")?.next_hook(init)
}

/// Run `f` once the current render has completed.
pub fn on_commit(f: impl FnOnce() + 'static) -> Result<()> {
    let current = rendering("on_commit")?;
    current.inner.commits.borrow_mut().push(Box::new(f));
    Ok(())
}

/// Run `f` when the current component unmounts.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Result<()> {
    let current = rendering("on_unmount")?;
    current.inner.cleanups.borrow_mut().push(Box::new(f));
    Ok(())
}
