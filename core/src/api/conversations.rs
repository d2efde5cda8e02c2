//! Conversations API.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{
    ConversationMessageResponse, ConversationMessagesRequest, ConversationSummary,
    UserConversationsRequest,
};
use crate::validate::require_text;

/// Conversations API client.
pub struct ConversationsApi {
    transport: Arc<Transport>,
}

impl ConversationsApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Messages of one conversation in display form.
    pub async fn messages(&self, conversation_id: Uuid) -> Result<Vec<ConversationMessageResponse>> {
        self.transport.require_authenticated()?;
        let request = ConversationMessagesRequest { conversation_id };
        self.transport
            .submit_list("/api/platform/conversation/getmessages", &request)
            .await
    }

    /// Every conversation of the project.
    pub async fn all(&self) -> Result<Vec<ConversationSummary>> {
        self.transport.fetch_list("/api/platform/conversations/all").await
    }

    /// Conversations of one user. The username is trimmed before sending.
    pub async fn for_user(&self, username: &str) -> Result<Vec<ConversationSummary>> {
        self.transport.require_authenticated()?;
        let username = require_text(username, "username")?.trim().to_string();
        let request = UserConversationsRequest { username };
        self.transport
            .submit_list("/api/platform/conversations/user", &request)
            .await
    }
}
