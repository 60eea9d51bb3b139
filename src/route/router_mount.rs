use std::sync::Arc;

use super::Mux;
use crate::{
    endpoint::BoxEndpoint,
    error::RouteError,
    middleware::{StripPrefix, StripPrefixEndpoint},
    Endpoint, EndpointExt, Request, Response, Result,
};

/// How a mounted endpoint is reached: the literal prefix stripped from the
/// path, and where requests outside of it go.
#[derive(Clone)]
pub(super) struct Mount {
    pub(super) strip: String,
    pub(super) not_found: Arc<dyn Endpoint>,
}

impl Mount {
    pub(super) fn wrap(&self, ep: Arc<dyn Endpoint>) -> BoxEndpoint {
        MountEndpoint {
            inner: ep.with(StripPrefix::new(&self.strip)),
            not_found: self.not_found.clone(),
        }
        .boxed()
    }
}

struct MountEndpoint<E> {
    inner: StripPrefixEndpoint<E>,
    not_found: Arc<dyn Endpoint>,
}

#[async_trait::async_trait]
impl<E: Endpoint> Endpoint for MountEndpoint<E> {
    async fn call(&self, req: Request) -> Result<Response> {
        if self.inner.matches(&req) {
            self.inner.call(req).await
        } else {
            self.not_found.call(req).await
        }
    }
}

/// Splits a mount prefix into the pattern to register and the literal text
/// to strip from request paths.
fn mount_pattern(prefix: &str) -> Result<(String, &str), RouteError> {
    if prefix.ends_with(":*}") {
        if let Some(open) = prefix.rfind('{') {
            return Ok((prefix.to_string(), &prefix[..open]));
        }
    } else if let Some(base) = prefix.strip_suffix('*') {
        return Ok((format!("{}{{:*}}", base), base));
    }
    Err(RouteError::MountWithoutWildcard(prefix.to_string()))
}

impl Mux {
    /// Mounts an endpoint under a prefix, for every method.
    ///
    /// The prefix must end with a catch-all wildcard, either `{name:*}` or a
    /// bare `*`. The endpoint sees the request path with the literal part of
    /// the prefix removed, always beginning with `/`. Requests whose path
    /// does not begin with that literal part go to the not found handler
    /// that is set when this method is called.
    ///
    /// To combine two routers, prefer [`Mux::merge`], which keeps
    /// redirects and `405` answers working for the merged routes.
    ///
    /// # Example
    ///
    /// ```
    /// use radix_mux::{endpoint::make_sync, route::Mux, test::TestClient};
    ///
    /// let mut mux = Mux::new();
    /// mux.mount("/static/*", make_sync(|req| req.uri().path().to_string()))
    ///     .unwrap();
    /// let cli = TestClient::new(mux);
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// cli.get("/static/css/app.css")
    ///     .send()
    ///     .await
    ///     .assert_text("/css/app.css")
    ///     .await;
    /// # });
    /// ```
    pub fn mount(&mut self, prefix: &str, ep: impl Endpoint) -> Result<(), RouteError> {
        let (pattern, strip) = mount_pattern(prefix)?;
        self.handle_mount(&pattern, strip, ep)
    }
}
