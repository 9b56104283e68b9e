//! Wire-adjacent data types and external interfaces for the command dispatch
//! core.
//!
//! This crate holds the parts of the system the core depends on but does not
//! implement itself: the policy data model, the error vocabulary the
//! transport understands, and the trait boundaries (`Transport`,
//! `AclEvaluator`, `CommandLogger`) that the real GSS-API transport, ACL
//! file, and audit logger would satisfy in a full remctld-style daemon.

mod error_code;
mod policy;
mod session;
mod transport;

pub use error_code::ErrorCode;
pub use policy::ALL;
pub use policy::EMPTY;
pub use policy::PolicyRule;
pub use policy::PolicyTable;
pub use session::Session;
pub use transport::AclEvaluator;
pub use transport::CommandLogger;
pub use transport::StreamId;
pub use transport::Transport;
