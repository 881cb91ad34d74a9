pub mod digest;
pub mod format;
pub mod paths;
pub mod platform;

pub use digest::Sha256Digest;
pub use format::ArchiveFormat;
pub use paths::{InstalledPath, SymlinkPath};
pub use platform::Platform;
