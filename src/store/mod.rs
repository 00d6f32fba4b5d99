//! Scoped stores and state publishers.
//!
//! Both factories hand out one state cell per mounted wrapper and expose it
//! to descendants through context:
//! - `ContextStore<T>`: readers and writers, split over two contexts so
//!   write-only components never re-render on value changes
//! - `StatePublisher<T>`: a read-only value driven by the wrapper's props

mod hooks;
mod publisher;
mod store;

pub use publisher::{create_state_publisher, PublisherProps, StatePublisher};
pub use store::{create_context_store, ContextStore, Dispatch};
