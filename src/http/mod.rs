//! HTTP request/response types for the replay layer

mod request;
mod response;

pub use request::{HeaderMap, ReplayRequestDescriptor, RequestEdits};
pub use response::ReplayResponse;
