pub mod digest;
pub mod download;
pub mod extract;
