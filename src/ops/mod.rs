//! Lifecycle operations composing the store, resolver, fetcher, extractor,
//! and activator.

pub mod add;
pub mod context;
pub mod error;
pub mod install;
pub mod remove;
pub mod switch;
pub mod update;

pub use add::{ParsedReleaseUrl, add_from_url};
pub use context::EngineContext;
pub use error::EngineError;
pub use install::{InstallOutcome, install};
pub use remove::{RemoveReport, remove};
pub use switch::switch;
pub use update::{CheckOutcome, check, check_all, update, update_all};
