//! Endpoint related types.

#[allow(clippy::module_inception)]
mod endpoint;

pub use endpoint::{make, make_sync, BoxEndpoint, Endpoint, EndpointExt};
