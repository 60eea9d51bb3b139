use std::{
    fmt::{self, Debug, Formatter},
    string::FromUtf8Error,
};

use bytes::Bytes;

/// A body object for requests and responses.
///
/// Bodies are fully buffered; reading one never blocks.
#[derive(Default, Clone, Eq, PartialEq)]
pub struct Body(pub(crate) Bytes);

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Body").field(&self.0.len()).finish()
    }
}

impl From<&'static [u8]> for Body {
    #[inline]
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl From<&'static str> for Body {
    #[inline]
    fn from(data: &'static str) -> Self {
        Self(Bytes::from_static(data.as_bytes()))
    }
}

impl From<Bytes> for Body {
    #[inline]
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<Vec<u8>> for Body {
    #[inline]
    fn from(data: Vec<u8>) -> Self {
        Self(data.into())
    }
}

impl From<String> for Body {
    #[inline]
    fn from(data: String) -> Self {
        Self(data.into())
    }
}

impl From<()> for Body {
    #[inline]
    fn from(_: ()) -> Self {
        Body::empty()
    }
}

impl Body {
    /// Create a body object from [`Bytes`].
    #[inline]
    pub fn from_bytes(data: Bytes) -> Self {
        data.into()
    }

    /// Create a body object from [`String`].
    #[inline]
    pub fn from_string(data: String) -> Self {
        data.into()
    }

    /// Create a body object from [`Vec<u8>`].
    #[inline]
    pub fn from_vec(data: Vec<u8>) -> Self {
        data.into()
    }

    /// Create an empty body.
    #[inline]
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Returns `true` if this body contains no data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the data of this body.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes this body object to return a [`Bytes`] that contains all data.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Consumes this body object to return a [`Vec<u8>`] that contains all
    /// data.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Consumes this body object to return a [`String`] that contains all data.
    pub fn into_string(self) -> Result<String, FromUtf8Error> {
        String::from_utf8(self.0.to_vec())
    }
}
