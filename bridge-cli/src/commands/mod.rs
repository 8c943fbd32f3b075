//! CLI command implementations.

pub mod import;
pub mod link;
pub mod serve;
pub mod status;
pub mod sync;
