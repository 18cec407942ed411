// hivekit-core: Reactive state and commands for Hive Home heating
//
// Sits between hivekit-api (raw HTTP) and consumers (the CLI, bridges).
// `Hive` owns the session, polls the node list, reduces it to a flat
// `State`, and publishes each snapshot to subscribers.

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod hive;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, NodeTarget};
pub use config::HiveConfig;
pub use error::CoreError;
pub use hive::{ChangeHandler, Hive, REFRESH_CHANNEL_SIZE, RefreshOutcome};
pub use model::{HeatingMode, MAX_TEMP, MIN_TEMP, NodeRole, State};
