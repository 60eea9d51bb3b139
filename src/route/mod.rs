//! Radix tree router and dispatcher.

mod config;
mod internal;
mod router;
mod router_mount;

pub use config::MuxConfig;
pub use internal::radix_tree::PathParams;
pub use router::{Mux, METHOD_WILD};
