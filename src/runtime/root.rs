use super::component::{Component, RenderMode};
use crate::error::Result;
use std::rc::Rc;

/// Top of a component tree.
///
/// Each call to [`render`](Root::render) renders the tree again with new
/// content; components found at the same position with the same name keep
/// their state. Dropping the root unmounts the whole tree.
///
/// # Examples
///
/// ```
/// use ctxstore::runtime::{component, Root};
///
/// let root = Root::new();
/// root.render(|| {
///     component("Hello", || Ok(()))?;
///     Ok(())
/// })
/// .unwrap();
/// assert_eq!(root.children()[0].name(), "Hello");
/// ```
pub struct Root {
    node: Component,
}

impl Root {
    /// Create a client-rendered root.
    pub fn new() -> Self {
        Self::with_mode(RenderMode::Client)
    }

    /// Create a root that renders in `mode`.
    pub fn with_mode(mode: RenderMode) -> Self {
        Self {
            node: Component::new_root("Root", mode),
        }
    }

    /// Render the tree with `children` as its content.
    pub fn render<F>(&self, children: F) -> Result<()>
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.node.set_render(Rc::new(children));
        self.node.run()
    }

    /// Top-level components from the last render.
    pub fn children(&self) -> Vec<Component> {
        self.node.children()
    }

    /// Mode used for components mounted by the next render.
    pub fn mode(&self) -> RenderMode {
        self.node.mode()
    }

    /// Unmount every component in the tree.
    pub fn unmount(&self) {
        self.node.unmount();
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.node.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::component;

    #[test]
    fn hydrate_root_switches_to_client_after_first_render() {
        let root = Root::with_mode(RenderMode::Hydrate);
        root.render(|| Ok(())).unwrap();
        assert_eq!(root.mode(), RenderMode::Client);
    }

    #[test]
    fn server_root_stays_server() {
        let root = Root::with_mode(RenderMode::Server);
        root.render(|| {
            component("Page", || Ok(()))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(root.mode(), RenderMode::Server);
        assert_eq!(root.children()[0].mode(), RenderMode::Server);
    }

    #[test]
    fn unmount_tears_down_tree() {
        let root = Root::new();
        root.render(|| {
            component("Leaf", || Ok(()))?;
            Ok(())
        })
        .unwrap();
        let leaf = root.children()[0].clone();
        root.unmount();
        assert!(!leaf.is_mounted());
        assert!(root.children().is_empty());
    }
}
