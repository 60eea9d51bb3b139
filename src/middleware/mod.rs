//! Commonly used middleware.

mod strip_prefix;
mod tracing;

pub use strip_prefix::{StripPrefix, StripPrefixEndpoint};
pub use self::tracing::{Tracing, TracingEndpoint};

use crate::Endpoint;

/// Represents a middleware trait.
///
/// # Example
///
/// ```
/// use radix_mux::{
///     async_trait, handler, http::StatusCode, test::TestClient, Endpoint, EndpointExt, Middleware,
///     Request, Response, Result,
/// };
///
/// /// A middleware that extracts a token from the request header.
/// struct TokenMiddleware;
///
/// impl<E: Endpoint> Middleware<E> for TokenMiddleware {
///     type Output = TokenMiddlewareImpl<E>;
///
///     fn transform(&self, ep: E) -> Self::Output {
///         TokenMiddlewareImpl { ep }
///     }
/// }
///
/// const TOKEN_HEADER: &str = "X-Token";
///
/// /// Token data
/// struct Token(String);
///
/// struct TokenMiddlewareImpl<E> {
///     ep: E,
/// }
///
/// #[async_trait]
/// impl<E: Endpoint> Endpoint for TokenMiddlewareImpl<E> {
///     async fn call(&self, mut req: Request) -> Result<Response> {
///         if let Some(value) = req
///             .header(TOKEN_HEADER)
///             .map(|value| value.to_string())
///         {
///             req.extensions_mut().insert(Token(value));
///         }
///         self.ep.call(req).await
///     }
/// }
///
/// #[handler]
/// async fn index(req: &Request) -> String {
///     req.data::<Token>().map(|token| token.0.clone()).unwrap_or_default()
/// }
///
/// let cli = TestClient::new(index.with(TokenMiddleware));
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let resp = cli.get("/").header(TOKEN_HEADER, "abc").send().await;
/// resp.assert_status_is_ok();
/// resp.assert_text("abc").await;
/// # });
/// ```
pub trait Middleware<E: Endpoint> {
    /// New endpoint type.
    ///
    /// If you don't know what type to use, then you can use
    /// [`BoxEndpoint`](crate::endpoint::BoxEndpoint), which will bring some
    /// performance loss, but it is insignificant.
    type Output: Endpoint;

    /// Transform the input [`Endpoint`] to another one.
    fn transform(&self, ep: E) -> Self::Output;
}

impl<E: Endpoint, M: Middleware<E> + ?Sized> Middleware<E> for &M {
    type Output = M::Output;

    fn transform(&self, ep: E) -> Self::Output {
        (**self).transform(ep)
    }
}
