//! Subcommand implementations.

mod consume;
mod control_plane;

pub use consume::{drain, run_consume, StopReason};
pub use control_plane::{authenticate, resolve_sink, run_sink, run_sinks};
