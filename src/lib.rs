//! radix-mux is an HTTP request multiplexer built on radix trees.
//!
//! Patterns are made of literal text, `{name}` parameters capturing one path
//! segment, `{name:regex}` parameters constrained by a regular expression,
//! `{name:*}` catch-all wildcards and `{name?}` optional parameters. Each
//! method has its own tree, and requests with no match are answered with
//! trailing slash and fixed path redirects, automatic `OPTIONS` responses and
//! `405 METHOD NOT ALLOWED` where appropriate.
//!
//! # Usage
//!
//! Depend on radix-mux in Cargo.toml:
//!
//! ```toml
//! radix-mux = "0.1"
//! ```
//!
//! # Example
//!
//! ```
//! use radix_mux::{handler, route::Mux, test::TestClient, web::Path, Request};
//!
//! #[handler]
//! async fn hello(Path(name): Path<String>) -> String {
//!     format!("hello: {}", name)
//! }
//!
//! #[handler]
//! async fn file(req: &Request) -> String {
//!     req.path_param("filepath").unwrap_or_default().to_string()
//! }
//!
//! let mut mux = Mux::new();
//! mux.get("/hello/{name:[a-z]+}", hello).unwrap();
//! mux.get("/static/{filepath:*}", file).unwrap();
//! let cli = TestClient::new(mux);
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! cli.get("/hello/world").send().await.assert_text("hello: world").await;
//! cli.get("/static/css/app.css").send().await.assert_text("css/app.css").await;
//! # });
//! ```

#![forbid(unsafe_code)]
#![deny(private_in_public, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod middleware;
pub mod route;
pub mod test;
pub mod web;

#[doc(inline)]
pub use http;

mod body;
mod request;
mod response;

pub use async_trait::async_trait;
pub use body::Body;
pub use endpoint::{Endpoint, EndpointExt};
pub use error::{Error, Result};
pub use middleware::Middleware;
pub use radix_mux_derive::handler;
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use route::Mux;
pub use web::{FromRequest, IntoResponse, RequestBody};
