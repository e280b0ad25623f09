//! Routing module
//!
//! Prefix matching strategies used by the request router:
//! - `exact`: literal prefix segments, bare prefix and mismatches rejected
//! - `first-segment`: legacy first-segment comparison

mod rewrite;

pub use rewrite::{MatchStrategy, PathMatcher, Prefix, RewriteResult};
