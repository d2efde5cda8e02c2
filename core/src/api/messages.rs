//! Platform messages API.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{
    AgentData, MessageType, PlatformMessage, PlatformMessageSubmissionRequest,
    PlatformMessageSubmissionResponse, SenderType,
};
use crate::validate::{require_id, require_opt_text, require_text};

const SUBMIT_PATH: &str = "/api/platform/messages/submit";

/// A message written by the end user.
///
/// The first six fields are required and must be non-blank.
#[derive(Debug, Clone, Default)]
pub struct HumanMessage {
    pub username: String,
    pub message: String,
    pub agent_name: String,
    pub agent_platform: String,
    pub agent_version: String,
    pub user_email: String,
    pub user_metadata: Option<Value>,
    pub intent: Option<String>,
    pub entities: Option<Value>,
    pub annotations: Option<Value>,
    pub source_event: Option<Value>,
    pub agent_metadata: Option<Value>,
    pub mode: Option<String>,
}

impl HumanMessage {
    pub fn new(
        username: impl Into<String>,
        message: impl Into<String>,
        agent_name: impl Into<String>,
        agent_platform: impl Into<String>,
        agent_version: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
            agent_name: agent_name.into(),
            agent_platform: agent_platform.into(),
            agent_version: agent_version.into(),
            user_email: user_email.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.username, "username")?;
        require_text(&self.message, "message")?;
        require_text(&self.agent_name, "agent_name")?;
        require_text(&self.agent_platform, "agent_platform")?;
        require_text(&self.agent_version, "agent_version")?;
        require_text(&self.user_email, "user_email")?;
        Ok(())
    }

    fn into_request(self) -> PlatformMessageSubmissionRequest {
        PlatformMessageSubmissionRequest {
            username: Some(self.username),
            email: Some(self.user_email),
            metadata: self.user_metadata,
            agent_data: Some(AgentData {
                name: self.agent_name,
                platform: self.agent_platform,
                version: Some(self.agent_version),
                metadata: self.agent_metadata,
            }),
            sender_type: Some(SenderType::Human),
            message: Some(self.message),
            intent: self.intent,
            entities: self.entities,
            annotations: self.annotations,
            message_type: Some(MessageType::Text),
            source_event: self.source_event,
            rag_context: None,
            reply_message_id: None,
            mode: self.mode,
        }
    }
}

/// An agent's reply to an earlier human message.
///
/// Carries the same required fields as [`HumanMessage`] plus the id of the
/// message being answered and the retrieved context the answer used.
#[derive(Debug, Clone, Default)]
pub struct BotMessage {
    pub username: String,
    pub message: String,
    pub agent_name: String,
    pub agent_platform: String,
    pub agent_version: String,
    pub user_email: String,
    pub reply_message_id: Option<Uuid>,
    pub rag_context: Option<String>,
    pub user_metadata: Option<Value>,
    pub intent: Option<String>,
    pub entities: Option<Value>,
    pub annotations: Option<Value>,
    pub source_event: Option<Value>,
    pub agent_metadata: Option<Value>,
    pub mode: Option<String>,
}

impl BotMessage {
    fn validate(&self) -> Result<()> {
        require_text(&self.username, "username")?;
        require_text(&self.message, "message")?;
        require_text(&self.agent_name, "agent_name")?;
        require_text(&self.agent_platform, "agent_platform")?;
        require_id(self.reply_message_id, "reply_message_id")?;
        require_opt_text(self.rag_context.as_deref(), "rag_context")?;
        require_text(&self.agent_version, "agent_version")?;
        require_text(&self.user_email, "user_email")?;
        Ok(())
    }

    fn into_request(self) -> PlatformMessageSubmissionRequest {
        PlatformMessageSubmissionRequest {
            username: Some(self.username),
            email: Some(self.user_email),
            metadata: self.user_metadata,
            agent_data: Some(AgentData {
                name: self.agent_name,
                platform: self.agent_platform,
                version: Some(self.agent_version),
                metadata: self.agent_metadata,
            }),
            sender_type: Some(SenderType::Bot),
            message: Some(self.message),
            intent: self.intent,
            entities: self.entities,
            annotations: self.annotations,
            message_type: Some(MessageType::Text),
            source_event: self.source_event,
            rag_context: self.rag_context,
            reply_message_id: self.reply_message_id,
            mode: self.mode,
        }
    }
}

/// Platform messages API client.
pub struct MessagesApi {
    transport: Arc<Transport>,
}

impl MessagesApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Submit a human message. Sender and message type are set automatically.
    pub async fn send_human_message(
        &self,
        message: HumanMessage,
    ) -> Result<PlatformMessageSubmissionResponse> {
        self.transport.require_authenticated()?;
        message.validate()?;
        self.submit(message.into_request()).await
    }

    /// Submit a bot reply. Sender and message type are set automatically.
    pub async fn send_bot_message(
        &self,
        message: BotMessage,
    ) -> Result<PlatformMessageSubmissionResponse> {
        self.transport.require_authenticated()?;
        message.validate()?;
        self.submit(message.into_request()).await
    }

    /// Submit a fully caller-built message without field checks.
    pub async fn submit(
        &self,
        request: PlatformMessageSubmissionRequest,
    ) -> Result<PlatformMessageSubmissionResponse> {
        self.transport.submit_one(SUBMIT_PATH, &request).await
    }

    /// All messages of the project.
    pub async fn get_all(&self) -> Result<Vec<PlatformMessage>> {
        self.transport.fetch_list("/api/platform/messages").await
    }

    pub async fn get_by_id(&self, message_id: Uuid) -> Result<PlatformMessage> {
        self.transport
            .fetch_one(&format!("/api/platform/messages/{message_id}"))
            .await
    }

    /// Messages handled by one agent.
    pub async fn get_by_agent(&self, agent_id: Uuid) -> Result<Vec<PlatformMessage>> {
        self.transport
            .fetch_list(&format!("/api/platform/messages/agent/{agent_id}"))
            .await
    }
}
