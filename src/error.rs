use thiserror::Error;

/// Errors raised by hooks and the component runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read or dispatch hook was called with no enclosing wrapper.
    #[error("`{hook}` must be used inside {store}.Wrapper")]
    MissingWrapper { hook: &'static str, store: String },

    /// A hook or component was used while no component was rendering.
    #[error("`{operation}` called outside of a component render")]
    OutsideRender { operation: &'static str },

    /// A component called its hooks in a different order than on its previous render.
    #[error("hook #{index} of component `{component}` changed type between renders")]
    HookMismatch { component: String, index: usize },
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
