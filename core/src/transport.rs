//! Typed request/response engine.
//!
//! # Design
//! Every call runs the same pipeline: `build_request` (pure: auth
//! precondition, URL, headers, body), `send` (the only I/O, one attempt, no
//! retry), then one of the pure `parse_*` functions (status mapping, JSON
//! decoding, timestamp coercion, known-field projection, shape check).
//!
//! Failures leave this module as either `Error::Precondition` (raised before
//! any I/O) or `Error::Api`. A typed failure produced inside the pipeline is
//! returned as-is; only faults without a status (network, decoding, shape
//! mismatch) are turned into a status-0 generic failure.
//!
//! `Transport` holds no mutable state. The base URL and API key are fixed at
//! construction, so one instance can be shared across tasks.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::endpoint::{Auth, Endpoint};
use crate::error::{ApiError, Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, API_KEY_HEADER};
use crate::shape::{self, ResultShape};
use crate::value::StructuredValue;

const MISSING_API_KEY: &str = "This operation requires an API key. \
Please initialize the client with an api_key parameter, \
or obtain one by registering a platform first.";

/// Shared HTTP transport for all resource facades.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Transport {
    /// Wrap an HTTP client. One trailing `/` is stripped from `base_url`. A
    /// blank API key counts as no key.
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url).to_string();
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fail unless an API key is configured. Never touches the network.
    pub fn require_authenticated(&self) -> Result<()> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(Error::Precondition(MISSING_API_KEY.to_string())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────

    /// Authenticated GET decoded into a single object.
    pub async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call_object(&Endpoint::get(path), None::<&()>).await
    }

    /// Authenticated GET decoded into a list of objects.
    pub async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let endpoint = Endpoint::get(path).with_shape(ResultShape::List);
        self.call_list(&endpoint, None::<&()>).await
    }

    /// Authenticated POST decoded into a single object.
    pub async fn submit_one<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call_object(&Endpoint::post(path), Some(body)).await
    }

    /// Authenticated POST decoded into a list of objects.
    pub async fn submit_list<T, B>(&self, path: &str, body: &B) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let endpoint = Endpoint::post(path).with_shape(ResultShape::List);
        self.call_list(&endpoint, Some(body)).await
    }

    /// POST without the API key, decoded into a single object.
    pub async fn submit_one_unauthenticated<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call_object(&Endpoint::post(path).anonymous(), Some(body))
            .await
    }

    /// GET without the API key, returning the payload untyped.
    pub async fn fetch_raw_unauthenticated(&self, path: &str) -> Result<StructuredValue> {
        let endpoint = Endpoint::get(path)
            .anonymous()
            .with_shape(ResultShape::Raw);
        self.call_raw(&endpoint, None::<&()>).await
    }

    /// Authenticated POST returning the payload untyped.
    pub async fn submit_raw<B>(&self, path: &str, body: Option<&B>) -> Result<StructuredValue>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = Endpoint::post(path).with_shape(ResultShape::Raw);
        self.call_raw(&endpoint, body).await
    }

    /// POST without the API key, returning the payload untyped.
    pub async fn submit_raw_unauthenticated<B>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<StructuredValue>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = Endpoint::post(path)
            .anonymous()
            .with_shape(ResultShape::Raw);
        self.call_raw(&endpoint, body).await
    }

    /// Run an object-shaped endpoint.
    pub async fn call_object<T, B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        expect_shape(endpoint, ResultShape::Object)?;
        let response = self.exchange(endpoint, body).await?;
        Ok(parse_object(&response)?)
    }

    /// Run a list-shaped endpoint.
    pub async fn call_list<T, B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        expect_shape(endpoint, ResultShape::List)?;
        let response = self.exchange(endpoint, body).await?;
        Ok(parse_list(&response)?)
    }

    /// Run a raw-shaped endpoint.
    pub async fn call_raw<B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<StructuredValue>
    where
        B: Serialize + ?Sized,
    {
        expect_shape(endpoint, ResultShape::Raw)?;
        let response = self.exchange(endpoint, body).await?;
        Ok(parse_raw(&response)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────

    /// Describe the request for `endpoint` without sending it.
    pub fn build_request<B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if endpoint.auth() == Auth::ApiKey {
            self.require_authenticated()?;
            if let Some(key) = &self.api_key {
                headers.push((API_KEY_HEADER.to_string(), key.clone()));
            }
        }

        let body = body
            .map(|b| {
                serde_json::to_vec(b)
                    .map_err(|e| ApiError::generic(0, format!("Failed to serialize request body: {e}"), None))
            })
            .transpose()?;

        Ok(HttpRequest {
            method: endpoint.method(),
            url: format!("{}{}", self.base_url, endpoint.path()),
            headers,
            body,
        })
    }

    /// Perform one HTTP round-trip. Faults without a status become status-0
    /// generic failures; non-success statuses are returned as data.
    pub async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(method = %request.method, url = %request.url, error = %e, "request failed");
            ApiError::io(e)
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            error!(url = %request.url, status, error = %e, "failed to read response body");
            ApiError::io(e)
        })?;
        debug!(url = %request.url, status, "response received");

        Ok(HttpResponse { status, body })
    }

    async fn exchange<B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(endpoint, body)?;
        let response = self.send(request).await?;
        if !response.is_success() {
            warn!(
                method = %endpoint.method(),
                path = endpoint.path(),
                status = response.status,
                "request returned non-success status"
            );
        }
        Ok(response)
    }
}

fn expect_shape(endpoint: &Endpoint, expected: ResultShape) -> Result<()> {
    if endpoint.shape() == expected {
        return Ok(());
    }
    Err(Error::Precondition(format!(
        "endpoint {} declares a {:?} result, not {:?}",
        endpoint.path(),
        endpoint.shape(),
        expected
    )))
}

// ─────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────

/// Decode a response into a single `T`.
///
/// Object payloads are projected onto the fields `T` declares; any other
/// payload is handed to `T` unchanged.
pub fn parse_object<T: DeserializeOwned>(response: &HttpResponse) -> std::result::Result<T, ApiError> {
    check_status(response)?;
    construct(decode(&response.body)?.into_json())
}

/// Decode a response into a list of `T`. A non-array payload is a generic
/// failure.
pub fn parse_list<T: DeserializeOwned>(response: &HttpResponse) -> std::result::Result<Vec<T>, ApiError> {
    check_status(response)?;
    match decode(&response.body)?.into_json() {
        Value::Array(items) => items.into_iter().map(construct::<T>).collect(),
        other => Err(ApiError::generic(
            0,
            format!("Expected list, got {}", json_type(&other)),
            None,
        )),
    }
}

/// Decode a response verbatim.
pub fn parse_raw(response: &HttpResponse) -> std::result::Result<StructuredValue, ApiError> {
    check_status(response)?;
    decode(&response.body)
}

/// Map a non-success status to its typed failure, keeping the raw body.
fn check_status(response: &HttpResponse) -> std::result::Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let body = (!response.body.is_empty()).then(|| response.body.clone());
    Err(ApiError::from_status(response.status, body))
}

fn decode(body: &str) -> std::result::Result<StructuredValue, ApiError> {
    if body.trim().is_empty() {
        return Ok(StructuredValue::Null);
    }
    let value: Value = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "response body is not valid JSON");
        ApiError::io(e)
    })?;
    Ok(StructuredValue::from_json(value))
}

fn construct<T: DeserializeOwned>(value: Value) -> std::result::Result<T, ApiError> {
    serde_json::from_value(shape::project::<T>(value)).map_err(|e| {
        error!(error = %e, "response does not match the expected shape");
        ApiError::io(e)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
