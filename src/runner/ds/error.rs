//! Error kinds raised while building fragments, resolving registry keys and
//! composing classes.
//!
//! None of these are transient. They surface wiring defects, so callers are
//! expected to abort setup on the first one instead of retrying.

use thiserror::Error;

/// Everything that can go wrong inside the kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// A fragment was created with an empty name.
    #[error("invalid fragment name {0:?}: expected a non-empty string")]
    InvalidFragmentName(String),

    /// A fragment's code was not a mapping, or a reserved key had the wrong shape.
    #[error("invalid code for fragment '{name}': {reason}")]
    InvalidFragmentCode { name: String, reason: String },

    /// No binding, singleton, extension or alias answers to the key.
    #[error("unable to resolve '{0}' from the registry")]
    Resolution(String),

    /// `extend`/`make` was called without a parent class.
    #[error("cannot derive a class without a parent")]
    MissingParent,

    /// Resolving a key required resolving the same key again.
    #[error("cycle detected while resolving '{key}': {}", .path.join(" -> "))]
    CycleDetected { key: String, path: Vec<String> },

    /// The member does not exist on the instance nor on its class chain.
    #[error("'{member}' is not defined on {class}")]
    UndefinedMember { class: String, member: String },

    /// The member exists but holds a plain value.
    #[error("'{member}' on {class} is not callable")]
    NotCallable { class: String, member: String },

    /// A bound method outlived the instance it was bound to.
    #[error("bound method '{0}' lost its target")]
    DetachedTarget(String),

    /// The instance was torn down by `destroy()`.
    #[error("instance {0} has been destroyed")]
    Destroyed(String),

    /// An event selector did not parse.
    #[error("invalid event selector {selector:?}: {reason}")]
    InvalidEventSelector { selector: String, reason: String },

    /// A value had the wrong shape for the operation.
    #[error("type error: {0}")]
    Type(String),

    /// The configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

pub type KernelResult<T> = Result<T, KernelError>;
