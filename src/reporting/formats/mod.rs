//! Export format implementations

pub mod csv;
pub mod curl;
pub mod json;
