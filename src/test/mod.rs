//! Test utilities to test your endpoints.

mod request_builder;

pub use client::TestClient;
pub use request_builder::TestRequestBuilder;
pub use response::TestResponse;
