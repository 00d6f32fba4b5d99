//! The mutable, subscribable value at the bottom of every store.
//!
//! This module provides:
//! - `StateCell<T>`: a value plus its change subscribers
//! - `Update<T>`: replace, merge or compute the next value
//! - `Shape`: how a value accepts partial updates

mod cell;
mod shape;

pub use cell::{StateCell, Subscription, Update};
pub use shape::Shape;
