//! Request handler module
//!
//! Responsible for prefix routing and dispatch to the file cache.

pub mod router;

// Re-export main entry points
pub use router::{FileService, RequestRouter};
