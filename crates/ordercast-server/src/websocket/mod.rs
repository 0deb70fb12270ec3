//! Real-time session layer: per-channel tasks, the session registry, the
//! wire protocol, and the expiry sweeper.

pub mod connection;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod sweeper;

pub use connection::ClientSession;
pub use protocol::OrderPush;
pub use registry::SessionRegistry;
pub use session::run_channel;
pub use sweeper::run_sweeper;
