//! Some common error types.

use std::{
    convert::Infallible,
    error::Error as StdError,
    fmt::{self, Debug, Display, Formatter},
    string::FromUtf8Error,
};

use crate::{http::StatusCode, IntoResponse, Response};

macro_rules! define_http_error {
    ($($(#[$docs:meta])* ($name:ident, $status:ident);)*) => {
        $(
        $(#[$docs])*
        #[allow(non_snake_case)]
        #[inline]
        pub fn $name(err: impl StdError + Send + Sync + 'static) -> Error {
            Error::new(StatusCode::$status).with_reason(err)
        }
        )*
    };
}

/// General error.
///
/// Handlers report failures by returning this type. Unless a custom error
/// sink is installed with [`Mux::on_error`](crate::route::Mux::on_error), it
/// is rendered with [`Error::as_response`].
#[derive(Debug)]
pub struct Error {
    status: StatusCode,
    reason: anyhow::Error,
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: err,
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Self {
        BadRequest(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        InternalServerError(err)
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Error::new(status)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.reason)
    }
}

#[derive(Debug)]
struct StatusError(StatusCode);

impl Display for StatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for StatusError {}

impl Error {
    /// Create a new error with status code.
    #[inline]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: anyhow::Error::from(StatusError(status)),
        }
    }

    /// Sets the reason for this error.
    #[inline]
    pub fn with_reason(self, reason: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            reason: anyhow::Error::from(reason),
            ..self
        }
    }

    /// Sets the reason string for this error.
    #[inline]
    pub fn with_reason_string(self, reason: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self {
            reason: anyhow::Error::msg(reason),
            ..self
        }
    }

    /// Returns the status code of this error.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the reason of this error.
    #[inline]
    pub fn reason(&self) -> &impl Display {
        &self.reason
    }

    /// Downcast this error object by reference.
    pub fn downcast_ref<T: Display + Debug + Send + Sync + 'static>(&self) -> Option<&T> {
        self.reason.downcast_ref()
    }

    /// Returns `true` if the reason of this error is of type `T`.
    pub fn is<T: Display + Debug + Send + Sync + 'static>(&self) -> bool {
        self.reason.is::<T>()
    }

    /// Creates full response for this error.
    #[inline]
    pub fn as_response(&self) -> Response {
        Response::builder()
            .status(self.status)
            .content_type("text/plain; charset=utf-8")
            .body(self.reason.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.as_response()
    }
}

define_http_error!(
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::BAD_REQUEST`].
    (BadRequest, BAD_REQUEST);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::FORBIDDEN`].
    (Forbidden, FORBIDDEN);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::NOT_FOUND`].
    (NotFound, NOT_FOUND);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::METHOD_NOT_ALLOWED`].
    (MethodNotAllowed, METHOD_NOT_ALLOWED);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::CONFLICT`].
    (Conflict, CONFLICT);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::UNPROCESSABLE_ENTITY`].
    (UnprocessableEntity, UNPROCESSABLE_ENTITY);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::INTERNAL_SERVER_ERROR`].
    (InternalServerError, INTERNAL_SERVER_ERROR);
    /// Wraps any error into [`Error`] and the status code is [`StatusCode::SERVICE_UNAVAILABLE`].
    (ServiceUnavailable, SERVICE_UNAVAILABLE);
);

/// A specialized Result type for radix-mux.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Represents a type that can be converted to `radix_mux::Result<T>`.
///
/// Handler return values go through this trait, so a handler may return
/// either a plain response type or a `Result` of one.
pub trait IntoResult<T: IntoResponse> {
    /// Consumes this value returns a `radix_mux::Result<T>`.
    fn into_result(self) -> Result<T>;
}

impl<T, E> IntoResult<T> for Result<T, E>
where
    T: IntoResponse,
    E: Into<Error> + Send + Sync + 'static,
{
    #[inline]
    fn into_result(self) -> Result<T> {
        self.map_err(Into::into)
    }
}

impl<T: IntoResponse> IntoResult<T> for T {
    #[inline]
    fn into_result(self) -> Result<T> {
        Ok(self)
    }
}

macro_rules! define_simple_errors {
    ($($(#[$docs:meta])* ($name:ident, $status:ident, $err_msg:literal);)*) => {
        $(
        $(#[$docs])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq)]
        pub struct $name;

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", $err_msg)
            }
        }

        impl StdError for $name {}

        impl From<$name> for Error {
            fn from(err: $name) -> Error {
                Error::new(StatusCode::$status).with_reason(err)
            }
        }
        )*
    };
}

define_simple_errors!(
    /// Only the endpoints under the router can get the path parameters, otherwise this error will occur.
    (ErrorMissingPathParams, INTERNAL_SERVER_ERROR, "missing path params");

    /// A path parameter could not be parsed into the requested type.
    (ErrorInvalidPathParams, BAD_REQUEST, "invalid path params");

    /// The request body has been taken by another extractor.
    (ErrorBodyHasBeenTaken, INTERNAL_SERVER_ERROR, "the request body has been taken");

    /// The request path does not start with the prefix an endpoint was mounted at.
    (ErrorPrefixMismatch, NOT_FOUND, "prefix mismatch");
);

/// A possible error value occurred when registering a route.
///
/// Registration errors are programmer errors: they are reported while the
/// routing table is being built and never at request time.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum RouteError {
    /// The method is an empty string.
    #[error("method must not be empty")]
    EmptyMethod,

    /// The method is not a valid HTTP token.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// The pattern is empty, does not begin with `/` or is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A parameter constraint is not a valid regular expression.
    #[error("invalid regex in path: {path} `{regex}`")]
    InvalidRegex {
        /// Path
        path: String,

        /// Regex
        regex: String,
    },

    /// The same concrete pattern was registered twice on an immutable tree.
    #[error("duplicate path: {0}")]
    Duplicate(String),

    /// Two incompatible parameters were registered at the same position.
    #[error("ambiguous parameter in path: {path}, conflicts with `{existing}`")]
    AmbiguousParam {
        /// Path
        path: String,

        /// The parameter definition that is already registered there.
        existing: String,
    },

    /// Something follows a catch-all wildcard.
    #[error("catch-all wildcard must be the last element of path: {0}")]
    WildcardNotLast(String),

    /// A non-router endpoint was mounted at a prefix that does not end with
    /// a wildcard.
    #[error("mount prefix must end with a wildcard: {0}")]
    MountWithoutWildcard(String),

    /// A handler replacement was requested on an immutable router.
    #[error("router is not mutable")]
    NotMutable,

    /// A handler replacement targets a route that was never registered.
    #[error("route not found: {method} {path}")]
    RouteNotFound {
        /// Method
        method: String,

        /// Path
        path: String,
    },
}
