use ::tracing::{Instrument, Level};

use super::Middleware;
use crate::{Endpoint, Request, Response, Result};

/// A middleware for tracing requests and responses.
///
/// Each request runs inside an `INFO` span carrying its method and URI. The
/// outcome is recorded as an `info` event for responses and an `error` event
/// for failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tracing;

impl<E: Endpoint> Middleware<E> for Tracing {
    type Output = TracingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        TracingEndpoint { inner: ep }
    }
}

/// Endpoint for `Tracing` middleware.
pub struct TracingEndpoint<E> {
    inner: E,
}

#[async_trait::async_trait]
impl<E: Endpoint> Endpoint for TracingEndpoint<E> {
    async fn call(&self, req: Request) -> Result<Response> {
        let span = ::tracing::span!(
            Level::INFO,
            "request",
            method = %req.method(),
            uri = %req.uri(),
        );

        async move {
            let resp = self.inner.call(req).await;

            match &resp {
                Ok(resp) => ::tracing::info!(status = %resp.status(), "response"),
                Err(err) => ::tracing::error!(
                    status = %err.status(),
                    error = %err,
                    "error"
                ),
            }

            resp
        }
        .instrument(span)
        .await
    }
}
