use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
    str::FromStr,
};

use crate::{
    error::{ErrorInvalidPathParams, ErrorMissingPathParams},
    web::RequestBody,
    Error, FromRequest, Request, Result,
};

/// An extractor that parses the first captured path parameter.
///
/// Routes with a single parameter (or a single catch-all) can read it
/// without naming it. Use [`Request::path_param`] or
/// [`PathParams`](crate::route::PathParams) when the route captures several
/// values.
///
/// # Example
///
/// ```
/// use radix_mux::{handler, route::Mux, web::Path};
///
/// #[handler]
/// async fn user(Path(id): Path<u64>) -> String {
///     format!("user {}", id)
/// }
///
/// let mut mux = Mux::new();
/// mux.get("/users/{id:[0-9]+}", user).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Path<T>(pub T);

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Path<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[async_trait::async_trait]
impl<'a, T> FromRequest<'a> for Path<T>
where
    T: FromStr + Send,
    T::Err: Display,
{
    async fn from_request(req: &'a Request, _body: &mut RequestBody) -> Result<Self> {
        let (_, value) = req
            .path_params()
            .iter()
            .next()
            .ok_or(ErrorMissingPathParams)?;
        value.parse().map(Path).map_err(|err: T::Err| {
            Error::from(ErrorInvalidPathParams).with_reason_string(err.to_string())
        })
    }
}
