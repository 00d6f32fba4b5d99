//! A minimal component runtime for hosting stores.
//!
//! This module provides the rendering contract the stores rely on:
//! context propagation without prop drilling, mounted component instances
//! with per-instance hook state, and a subscription primitive that reads a
//! snapshot synchronously and re-renders its owner when the snapshot changes.

mod component;
mod context;
mod external;
mod root;

pub use component::{
    children, component, current_component, keep_children, on_commit, on_unmount, use_hook, Children,
    Component, RenderMode,
};
pub(crate) use component::keyed_component;
pub use context::{create_context, provide, use_context, ContextKey};
pub use external::{use_sync_external_store, ExternalStore, SnapshotFn};
pub use root::Root;
