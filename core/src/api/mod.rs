//! Resource facades.
//!
//! Each facade validates its arguments, builds one request value and hands
//! it to the shared [`Transport`](crate::transport::Transport). Failures from
//! the transport are returned unchanged.

mod agents;
mod analytics;
mod conversations;
mod eval;
mod messages;
mod platform;
mod platform_session;
mod users;

pub use agents::AgentsApi;
pub use analytics::{AnalyticsApi, DEFAULT_PROJECT_TOP_LIMIT, DEFAULT_TOP_LIMIT};
pub use conversations::ConversationsApi;
pub use eval::{EvalApi, InternalApi};
pub use messages::{BotMessage, HumanMessage, MessagesApi};
pub use platform::PlatformApi;
pub use platform_session::PlatformSessionApi;
pub use users::UsersApi;
