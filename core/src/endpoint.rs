//! Endpoint descriptors.

use url::Url;

use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::shape::ResultShape;

/// Whether a call carries the project API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    ApiKey,
    Anonymous,
}

/// What a single call needs to know about its endpoint: verb, path,
/// credential requirement and the shape of a successful payload.
///
/// Constructors default to an authenticated call with an object result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: HttpMethod,
    path: String,
    auth: Auth,
    shape: ResultShape,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            auth: Auth::ApiKey,
            shape: ResultShape::Object,
        }
    }

    /// Send without the `Api-Key` header.
    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    pub fn with_shape(mut self, shape: ResultShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth(&self) -> Auth {
        self.auth
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }
}

/// Percent-encode `value` as a single path segment, so `/`, `?` and `#`
/// cannot change the route.
pub fn path_segment(value: &str) -> Result<String> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|e| Error::Config(format!("path encoding unavailable: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::Config("path encoding unavailable".to_string()))?
        .push(value);
    Ok(url.path().trim_start_matches('/').to_string())
}
