// ── Domain model ──
//
// The flat view of a Hive installation that consumers depend on. Built
// from raw nodes by `convert::reduce`; never mutated after construction.

pub mod role;
pub mod state;

pub use role::NodeRole;
pub use state::{HeatingMode, MAX_TEMP, MIN_TEMP, State};
