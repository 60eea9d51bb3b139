use std::sync::Arc;

use crate::{
    error::{BadRequest, ErrorPrefixMismatch, InternalServerError, NotFound},
    http::{uri::PathAndQuery, Uri},
    Endpoint, Middleware, Request, Response, Result,
};

/// Middleware for remove path prefix.
///
/// The remaining path always begins with `/`, so stripping `/static` from
/// `/static` yields `/`. Requests whose path does not begin with the prefix
/// fail with `404 NOT FOUND`.
pub struct StripPrefix {
    prefix: Arc<str>,
}

impl StripPrefix {
    /// Create new `StripPrefix` middleware with specified prefix.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().into(),
        }
    }
}

impl<E: Endpoint> Middleware<E> for StripPrefix {
    type Output = StripPrefixEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        StripPrefixEndpoint {
            inner: ep,
            prefix: self.prefix.clone(),
        }
    }
}

/// Endpoint for `StripPrefix` middleware.
pub struct StripPrefixEndpoint<E> {
    inner: E,
    prefix: Arc<str>,
}

impl<E> StripPrefixEndpoint<E> {
    /// Returns `true` if the path of this request starts with the prefix.
    pub fn matches(&self, req: &Request) -> bool {
        req.uri().path().starts_with(&*self.prefix)
    }
}

pub(crate) fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Result<Uri>> {
    let rest = uri.path().strip_prefix(prefix)?;

    let mut path = String::with_capacity(rest.len() + 1);
    if !rest.starts_with('/') {
        path.push('/');
    }
    path.push_str(rest);
    if let Some(query) = uri.query() {
        path.push('?');
        path.push_str(query);
    }

    let path_and_query = match PathAndQuery::try_from(path) {
        Ok(path_and_query) => path_and_query,
        Err(err) => return Some(Err(BadRequest(err))),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Some(Uri::from_parts(parts).map_err(InternalServerError))
}

#[async_trait::async_trait]
impl<E: Endpoint> Endpoint for StripPrefixEndpoint<E> {
    async fn call(&self, mut req: Request) -> Result<Response> {
        let uri = match strip_prefix(req.uri(), &self.prefix) {
            Some(uri) => uri?,
            None => return Err(NotFound(ErrorPrefixMismatch)),
        };
        req.set_uri(uri);
        self.inner.call(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{endpoint::make_sync, http::StatusCode, EndpointExt};

    #[tokio::test]
    async fn test_strip_prefix() {
        let ep = make_sync(|req| req.uri().to_string()).with(StripPrefix::new("/static"));

        let resp = ep
            .call(Request::builder().uri_str("/static/css/app.css?v=1").finish())
            .await
            .unwrap();
        assert_eq!(resp.into_body().into_string().unwrap(), "/css/app.css?v=1");

        let resp = ep
            .call(Request::builder().uri_str("/static").finish())
            .await
            .unwrap();
        assert_eq!(resp.into_body().into_string().unwrap(), "/");

        let err = ep
            .call(Request::builder().uri_str("/assets/app.css").finish())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.is::<ErrorPrefixMismatch>());
    }
}
