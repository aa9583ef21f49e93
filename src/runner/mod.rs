//! The composition kernel.

pub mod api;
pub mod compose;
pub mod ds;
pub mod plugin;
pub mod std_lib;
