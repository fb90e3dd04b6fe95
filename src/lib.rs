//! chaos-reviewer library crate
//!
//! Build/test log triage with one-line fixes, short explanations and a
//! closing remark. The binary wires these modules to a terminal chat, a
//! webhook and a polling bridge; benchmarks and integration tests use them
//! directly.

pub mod bridge;
pub mod config;
pub mod error;
pub mod keyring;
pub mod llm;
pub mod logging;
pub mod quips;
pub mod reply;
pub mod server;
pub mod transport;
pub mod triage;
pub mod util;
