//! # ctxstore
//!
//! Scoped state containers with selector-driven re-render control.
//!
//! ctxstore provides two levels of abstraction:
//!
//! ## Cells (Low-level primitive)
//!
//! - `StateCell<T>` - A mutable value with change subscribers
//! - `Update<T>` - Replace, shallow-merge or compute the next value
//! - `Shape` - How a state type accepts partial updates
//!
//! ## Stores (Component-level state sharing)
//!
//! - `create_context_store` - A store scoped to a wrapper's subtree, with
//!   separate read and dispatch hooks
//! - `create_state_publisher` - A read-only value published by a wrapper's props
//!
//! Stores live inside the component runtime in [`runtime`]: wrappers and
//! readers are components, values travel through context, and readers
//! re-render only when the slice they selected changes.

pub mod cell;
mod error;
pub mod runtime;
pub mod store;

// Re-export main types for convenience
pub use cell::{Shape, StateCell, Subscription, Update};
pub use error::{Error, Result};
pub use runtime::{children, component, Children, Component, RenderMode, Root};
pub use store::{
    create_context_store, create_state_publisher, ContextStore, Dispatch, PublisherProps,
    StatePublisher,
};
