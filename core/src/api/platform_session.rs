//! Conversation session API.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{EndConversationRequest, EndConversationResponse};
use crate::value::StructuredValue;

/// Starts and ends conversation sessions.
pub struct PlatformSessionApi {
    transport: Arc<Transport>,
}

impl PlatformSessionApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Open a session. The response schema is still evolving server-side, so
    /// it is returned untyped. Sends `{}` when `request` is `None`.
    pub async fn initiate(&self, request: Option<Value>) -> Result<StructuredValue> {
        self.transport.require_authenticated()?;
        let body = request.unwrap_or_else(|| Value::Object(Default::default()));
        self.transport
            .submit_raw("/api/platformsession/initiate", Some(&body))
            .await
    }

    /// Close an active conversation.
    pub async fn end_conversation(&self, conversation_id: Uuid) -> Result<EndConversationResponse> {
        self.transport.require_authenticated()?;
        let request = EndConversationRequest { conversation_id };
        self.transport
            .submit_one("/api/platformsession/endconversation", &request)
            .await
    }
}
