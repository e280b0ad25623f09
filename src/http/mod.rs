//! HTTP protocol layer module
//!
//! Response builders and conditional request helpers, decoupled from the
//! router and the file cache that use them.

pub mod conditional;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_405_response, build_500_response, build_file_response,
};
