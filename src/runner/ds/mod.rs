//! Core data structures: values, methods, fragments, classes and instances.

pub mod error;
pub mod value;
pub mod method;
pub mod resolve;
pub mod fragment;
pub mod class;
pub mod object;
