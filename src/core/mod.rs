//! Collection core: collectors, snapshot assembly, plugin callbacks, sinks,
//! and the standalone host loop.

pub mod collectors;
pub mod executor;
pub mod plugin;
pub mod sink;
pub mod snapshot;
pub mod state;
