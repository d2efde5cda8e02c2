//! Async client SDK for the ShiftAI agentic infrastructure platform.
//!
//! # Overview
//! Register a project, manage users and agents, submit human and bot
//! messages, read conversation history, record feedback and pull analytics
//! over the backend's HTTP/JSON API.
//!
//! # Design
//! - `Transport` is the only component that talks to the network. It builds
//!   plain-data `HttpRequest` values, performs one round-trip per call, maps
//!   non-success statuses onto `ApiError` and decodes successes into the
//!   declared result shape (object, list or raw `StructuredValue`).
//! - Decoding tolerates fields the SDK does not know about and coerces
//!   ISO-8601 timestamps at any depth of the payload.
//! - Facades (`users()`, `messages()`, ...) only check arguments and delegate.
//! - Caller mistakes surface as `Error::Precondition` before any I/O.

pub mod api;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod shape;
pub mod transport;
pub mod types;
pub mod value;

mod validate;

pub use api::{
    AgentsApi, AnalyticsApi, BotMessage, ConversationsApi, EvalApi, HumanMessage, InternalApi,
    MessagesApi, PlatformApi, PlatformSessionApi, UsersApi, DEFAULT_PROJECT_TOP_LIMIT,
    DEFAULT_TOP_LIMIT,
};
pub use client::{ClientBuilder, ShiftAiClient};
pub use endpoint::{Auth, Endpoint};
pub use error::{ApiError, ApiErrorKind, Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use shape::ResultShape;
pub use transport::Transport;
pub use types::*;
pub use value::StructuredValue;
