// hivekit-api: Async Rust client for the Hive Home (Omnia) API

pub mod client;
pub mod error;
pub mod nodes;
pub mod session;
pub mod transport;

pub use client::HiveClient;
pub use error::{AuthError, Error};
pub use nodes::{Node, NodeAttributes, NodeUpdate, Report};
pub use session::{Credentials, Session, SessionManager};
pub use transport::{TlsMode, TransportConfig};
