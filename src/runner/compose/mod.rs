//! Class composition: fragments in, classes out.
//!
//! - [`composer`]: `extend`/`make`, plus the `mix`/`include` primitives
//! - [`deep_merge`]: list/map members combined along the class chain
//! - [`initializer`]: per-instance fragment initializers, run once each

pub mod composer;
pub mod deep_merge;
pub mod initializer;

pub use composer::{include, mix, ClassComposer, Part};
pub use initializer::{init, init_with};
