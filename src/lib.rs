//! armory: a per-user manager for third-party executables shipped as
//! GitHub release assets.
//!
//! The engine installs a release archive into a versioned payload
//! directory, verifies it, extracts the one executable, and points a
//! stable symlink in the user's bin directory at it. SQLite is the record
//! of truth; the symlink is the only user-visible mutable state.

pub mod activate;
pub mod config;
pub mod io;
pub mod layout;
pub mod ops;
pub mod resolver;
pub mod store;
pub mod types;

/// Sent on every upstream request; GitHub rejects agent-less requests.
pub const USER_AGENT: &str = concat!("armory/", env!("CARGO_PKG_VERSION"));
