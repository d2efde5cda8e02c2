//! Error types for the ShiftAI client.
//!
//! # Design
//! Two families of failure reach callers. `Error::Precondition` signals caller
//! misuse (a blank required field, a missing API key) and is always raised
//! before any network activity. `ApiError` is the typed failure produced by
//! the transport: it carries the HTTP status, a human message and, when the
//! server sent one, the raw response body. Status 0 means no HTTP status was
//! observed at all (network fault, undecodable payload, shape mismatch).

use thiserror::Error;

/// Classification of an [`ApiError`], keyed by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 401.
    Unauthorized,
    /// 400.
    BadRequest,
    /// 404.
    NotFound,
    /// Any status in `500..600`.
    Server,
    /// Every other status, and status 0 for faults with no HTTP status.
    Generic,
}

/// A typed failure observed at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error {status}: {message}{}", render_body(.body))]
pub struct ApiError {
    kind: ApiErrorKind,
    status: u16,
    message: String,
    body: Option<String>,
}

fn render_body(body: &Option<String>) -> String {
    match body {
        Some(body) if !body.is_empty() => format!("\nResponse: {body}"),
        _ => String::new(),
    }
}

impl ApiError {
    pub fn unauthorized(body: Option<String>) -> Self {
        Self::with_kind(ApiErrorKind::Unauthorized, 401, "Unauthorized", body)
    }

    pub fn bad_request(body: Option<String>) -> Self {
        Self::with_kind(ApiErrorKind::BadRequest, 400, "Bad Request", body)
    }

    pub fn not_found(body: Option<String>) -> Self {
        Self::with_kind(ApiErrorKind::NotFound, 404, "Not Found", body)
    }

    /// Build a 5xx failure.
    ///
    /// A status outside `500..600` is a contract violation and yields
    /// [`Error::Precondition`] instead of an `ApiError`.
    pub fn server(status: u16, message: impl Into<String>, body: Option<String>) -> Result<Self> {
        if !(500..600).contains(&status) {
            return Err(Error::Precondition(format!(
                "server error requires a 5xx status code, got {status}"
            )));
        }
        Ok(Self::with_kind(ApiErrorKind::Server, status, message, body))
    }

    pub fn generic(status: u16, message: impl Into<String>, body: Option<String>) -> Self {
        Self::with_kind(ApiErrorKind::Generic, status, message, body)
    }

    /// A fault with no HTTP status: the request never completed, or its
    /// payload could not be decoded.
    pub fn io(description: impl std::fmt::Display) -> Self {
        Self::generic(0, format!("IO error: {description}"), None)
    }

    /// Map a non-success HTTP status onto the matching kind.
    pub fn from_status(status: u16, body: Option<String>) -> Self {
        match status {
            401 => Self::unauthorized(body),
            400 => Self::bad_request(body),
            404 => Self::not_found(body),
            500..=599 => Self::with_kind(ApiErrorKind::Server, status, "Server Error", body),
            _ => Self::generic(
                status,
                format!("API request failed with status {status}"),
                body,
            ),
        }
    }

    /// Replace the default message, keeping kind, status and body.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn with_kind(kind: ApiErrorKind, status: u16, message: impl Into<String>, body: Option<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            body,
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// HTTP status, or 0 when none was observed.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw response body captured on the failure path, if any.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller violated an operation's contract; no request was sent.
    #[error("{0}")]
    Precondition(String),

    /// The client could not be constructed from the supplied settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request was attempted and failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::NotFound)
    }

    pub fn is_server_error(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::Server)
    }

    /// The typed failure, when this error carries one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        self.as_api().map(ApiError::kind)
    }

    /// HTTP status of the underlying typed failure.
    pub fn status(&self) -> Option<u16> {
        self.as_api().map(ApiError::status)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_specific_kinds() {
        assert_eq!(ApiError::from_status(401, None).kind(), ApiErrorKind::Unauthorized);
        assert_eq!(ApiError::from_status(400, None).kind(), ApiErrorKind::BadRequest);
        assert_eq!(ApiError::from_status(404, None).kind(), ApiErrorKind::NotFound);
    }

    #[test]
    fn from_status_covers_whole_5xx_range() {
        for status in [500, 502, 503, 599] {
            let err = ApiError::from_status(status, None);
            assert_eq!(err.kind(), ApiErrorKind::Server);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn from_status_falls_back_to_generic() {
        for status in [302, 403, 409, 429, 600] {
            let err = ApiError::from_status(status, Some("nope".to_string()));
            assert_eq!(err.kind(), ApiErrorKind::Generic);
            assert_eq!(err.status(), status);
            assert_eq!(err.body(), Some("nope"));
        }
    }

    #[test]
    fn server_rejects_non_5xx_status() {
        let err = ApiError::server(200, "oops", None).unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("200"));

        assert!(ApiError::server(499, "oops", None).is_err());
        assert!(ApiError::server(600, "oops", None).is_err());
    }

    #[test]
    fn server_accepts_5xx_and_renders_status_and_message() {
        let err = ApiError::server(503, "Service Unavailable", None).unwrap();
        assert_eq!(err.kind(), ApiErrorKind::Server);
        let rendered = err.to_string();
        assert!(rendered.contains("503"));
        assert!(rendered.contains("Service Unavailable"));
        assert!(!rendered.contains("Response:"));
    }

    #[test]
    fn default_messages_can_be_overridden() {
        let err = ApiError::unauthorized(Some("{}".to_string())).with_message("API key revoked");
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.status(), 401);
        assert_eq!(err.message(), "API key revoked");
        assert_eq!(err.body(), Some("{}"));
        assert_eq!(ApiError::not_found(None).message(), "Not Found");
        assert_eq!(
            ApiError::bad_request(None).with_message("email is required").to_string(),
            "API error 400: email is required"
        );
    }

    #[test]
    fn display_appends_raw_body() {
        let err = ApiError::bad_request(Some(r#"{"error":"projectName missing"}"#.to_string()));
        assert_eq!(
            err.to_string(),
            "API error 400: Bad Request\nResponse: {\"error\":\"projectName missing\"}"
        );
    }

    #[test]
    fn io_errors_have_status_zero() {
        let err = ApiError::io("connection refused");
        assert_eq!(err.kind(), ApiErrorKind::Generic);
        assert_eq!(err.status(), 0);
        assert_eq!(err.message(), "IO error: connection refused");
    }

    #[test]
    fn error_predicates() {
        let err = Error::from(ApiError::not_found(None));
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), Some(404));

        let err = Error::Precondition("username is required".to_string());
        assert!(err.is_precondition());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "username is required");
    }
}
