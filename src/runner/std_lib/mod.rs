//! Standard fragments and the event primitive they build on.
//!
//! - [`emitter`]: `on`/`off`/`trigger`/`listen_to`/`stop_listening`, carried by every instance
//! - [`events`]: namespaced and catalogued events (`Events`)
//! - [`properties`]: property access with change events (`Properties`)
//! - [`own_props`]: per-instance copies of prototype defaults (`OwnProps`)
//! - [`auto_extend`]: whitelisted constructor options copied onto the instance (`AutoExtend`)

pub mod core;
pub mod emitter;
pub mod selector;
pub mod events;
pub mod properties;
pub mod own_props;
pub mod auto_extend;

pub use self::core::register_core_fragments;
