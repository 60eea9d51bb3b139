use std::{future::Future, marker::PhantomData, sync::Arc};

use crate::{error::IntoResult, IntoResponse, Middleware, Request, Response, Result};

/// An HTTP request handler.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Get the response to the request.
    async fn call(&self, req: Request) -> Result<Response>;

    /// Get the response to the request and convert a failure into a response.
    async fn get_response(&self, req: Request) -> Response {
        self.call(req)
            .await
            .unwrap_or_else(|err| err.into_response())
    }
}

/// A boxed `Endpoint` trait object.
pub type BoxEndpoint = Box<dyn Endpoint>;

#[async_trait::async_trait]
impl<T: Endpoint + ?Sized> Endpoint for Box<T> {
    async fn call(&self, req: Request) -> Result<Response> {
        self.as_ref().call(req).await
    }
}

#[async_trait::async_trait]
impl<T: Endpoint + ?Sized> Endpoint for Arc<T> {
    async fn call(&self, req: Request) -> Result<Response> {
        self.as_ref().call(req).await
    }
}

struct SyncFnEndpoint<F, T> {
    f: F,
    _mark: PhantomData<fn() -> T>,
}

#[async_trait::async_trait]
impl<F, T, R> Endpoint for SyncFnEndpoint<F, T>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResult<T>,
    T: IntoResponse + 'static,
{
    async fn call(&self, req: Request) -> Result<Response> {
        (self.f)(req).into_result().map(IntoResponse::into_response)
    }
}

struct AsyncFnEndpoint<F, T> {
    f: F,
    _mark: PhantomData<fn() -> T>,
}

#[async_trait::async_trait]
impl<F, Fut, T, R> Endpoint for AsyncFnEndpoint<F, T>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoResult<T>,
    T: IntoResponse + 'static,
{
    async fn call(&self, req: Request) -> Result<Response> {
        (self.f)(req)
            .await
            .into_result()
            .map(IntoResponse::into_response)
    }
}

/// Create an endpoint with a function.
///
/// The function can return any type that implements [`IntoResult`].
///
/// # Example
///
/// ```
/// use radix_mux::{endpoint::make_sync, Endpoint, Request};
///
/// let ep = make_sync(|req| req.method().to_string());
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let resp = ep.get_response(Request::default()).await;
/// assert_eq!(resp.into_body().into_string().unwrap(), "GET");
/// # });
/// ```
pub fn make_sync<F, T, R>(f: F) -> impl Endpoint
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResult<T>,
    T: IntoResponse + 'static,
{
    SyncFnEndpoint {
        f,
        _mark: PhantomData,
    }
}

/// Create an endpoint with a asyncness function.
///
/// The function can return any type that implements [`IntoResult`].
///
/// # Example
///
/// ```
/// use radix_mux::{endpoint::make, Endpoint, Request};
///
/// let ep = make(|req| async move { req.method().to_string() });
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let resp = ep.get_response(Request::default()).await;
/// assert_eq!(resp.into_body().into_string().unwrap(), "GET");
/// # });
/// ```
pub fn make<F, Fut, T, R>(f: F) -> impl Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoResult<T>,
    T: IntoResponse + 'static,
{
    AsyncFnEndpoint {
        f,
        _mark: PhantomData,
    }
}

/// Extension trait for [`Endpoint`].
pub trait EndpointExt: Endpoint {
    /// Wrap the endpoint in a Box.
    fn boxed(self) -> BoxEndpoint
    where
        Self: Sized,
    {
        Box::new(self)
    }

    /// Use middleware to transform this endpoint.
    ///
    /// # Example
    ///
    /// ```
    /// use radix_mux::{endpoint::make_sync, middleware::Tracing, EndpointExt};
    ///
    /// let ep = make_sync(|_| "hello").with(Tracing);
    /// ```
    fn with<T>(self, middleware: T) -> T::Output
    where
        T: Middleware<Self>,
        Self: Sized,
    {
        middleware.transform(self)
    }
}

impl<T: Endpoint> EndpointExt for T {}
