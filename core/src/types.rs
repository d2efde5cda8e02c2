//! Request and response payloads for the ShiftAI platform API.
//!
//! # Design
//! Field names follow the backend's camelCase wire format. Every response
//! field is optional and defaults when absent: the backend owns the schema and
//! adds fields over time, so decoding never depends on a field being present.
//! Request types skip `None` fields instead of sending explicit nulls.
//!
//! Free-form payload parts (metadata, entities, nested backend entities) are
//! plain `serde_json::Value` on requests and `StructuredValue` on responses,
//! where embedded timestamps arrive already coerced.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::value::StructuredValue;

pub type Timestamp = DateTime<FixedOffset>;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    Human,
    Bot,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Video,
    File,
    #[serde(other)]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Platform registration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRegistrationRequest {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Result of registering a project; carries the project's API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformRegistrationResponse {
    pub id: Option<i64>,
    pub tenant_id: Option<String>,
    pub project_name: Option<String>,
    pub api_key: Option<String>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub created_at: Option<Timestamp>,
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users and agents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub project_name: Option<String>,
    pub metadata: Option<StructuredValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub name: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Agent {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub project_name: Option<String>,
    pub metadata: Option<StructuredValue>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Agent identity embedded in a message submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    pub name: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Wire body of `POST /api/platform/messages/submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformMessageSubmissionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_data: Option<AgentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<SenderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_message_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// One turn of a previous conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationMessage {
    pub sender: Option<SenderType>,
    pub message: Option<String>,
}

/// A semantically similar past exchange returned with human messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimilarConversation {
    pub text: Option<String>,
    pub human_message_id: Option<String>,
    pub bot_message_id: Option<String>,
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub timestamp: Option<String>,
    pub message_type: Option<String>,
    pub generated_context: Option<String>,
    pub confidence: Option<f64>,
    pub certainty: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformMessageSubmissionResponse {
    pub success: Option<bool>,
    pub message_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub message: Option<String>,
    pub contextual_prompt: Option<StructuredValue>,
    /// Set for human messages only.
    pub human_query: Option<String>,
    pub previous_k_conversations: Option<Vec<Vec<ConversationMessage>>>,
    /// Set for human messages only.
    pub similar_conversations: Option<Vec<SimilarConversation>>,
    /// Set for bot messages only.
    pub operation_status: Option<HashMap<String, bool>>,
    pub conversation_title: Option<String>,
}

/// A stored message as the backend persists it, relations included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformMessage {
    pub id: Option<Uuid>,
    pub message: Option<String>,
    #[serde(alias = "senderType")]
    pub sender: Option<SenderType>,
    pub message_type: Option<MessageType>,

    pub platform_user: Option<StructuredValue>,
    pub agent: Option<StructuredValue>,
    pub user: Option<StructuredValue>,
    pub conversation: Option<StructuredValue>,
    pub reply_to_message: Option<StructuredValue>,

    pub project_name: Option<String>,
    pub agent_name: Option<String>,
    pub mode: Option<String>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub timestamp: Option<Timestamp>,
    pub intent: Option<String>,
    pub entities: Option<StructuredValue>,
    pub annotations: Option<StructuredValue>,
    pub source_event: Option<StructuredValue>,
    pub message_embedding: Option<StructuredValue>,
    pub generated_context: Option<String>,
    pub rag_context: Option<String>,

    pub eval_record_id: Option<String>,
    pub eval_sync_status: Option<String>,
    pub eval_sync_error: Option<String>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub eval_sync_timestamp: Option<Timestamp>,
    pub eval_total_tokens: Option<i64>,
    pub eval_total_cost: Option<f64>,

    pub like_feedback: Option<bool>,
    pub dislike_feedback: Option<bool>,
    pub feedback_text: Option<String>,
    pub regeneration: Option<bool>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub feedback_updated_at: Option<Timestamp>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback and analytics
// ─────────────────────────────────────────────────────────────────────────────

/// Feedback on a bot message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmissionRequest {
    pub message_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislike: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeneration: Option<bool>,
}

impl FeedbackSubmissionRequest {
    pub fn new(message_id: Uuid) -> Self {
        Self {
            message_id,
            like: None,
            dislike: None,
            feedback: None,
            regeneration: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackSubmissionResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub bot_message_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_users: Option<i64>,
    pub total_agents: Option<i64>,
    pub total_queries: Option<i64>,
    pub total_responses: Option<i64>,
    pub avg_response_time_seconds: Option<f64>,
    pub total_feedback: Option<i64>,
    pub likes: Option<i64>,
    pub dislikes: Option<i64>,
    pub regenerates: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopAgent {
    pub rank: Option<i64>,
    pub agent_name: Option<String>,
    pub agent_id: Option<Uuid>,
    pub query_count: Option<i64>,
    pub satisfaction_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopUser {
    pub rank: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
    pub query_count: Option<i64>,
    pub avg_response_time_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserAnalytics {
    pub username: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
    pub queries: Option<i64>,
    pub responses: Option<i64>,
    pub avg_response_time_seconds: Option<f64>,
    pub likes: Option<i64>,
    pub dislikes: Option<i64>,
    pub regenerates: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectAnalytics {
    pub total_users: Option<i64>,
    pub total_agents: Option<i64>,
    pub total_queries: Option<i64>,
    pub total_responses: Option<i64>,
    pub avg_response_time_seconds: Option<f64>,
    pub total_feedback: Option<i64>,
    pub likes: Option<i64>,
    pub dislikes: Option<i64>,
    pub regenerates: Option<i64>,
    pub top_user_activity: Option<Vec<StructuredValue>>,
    pub top_devices_by_usage: Option<Vec<StructuredValue>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations and sessions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationMessagesRequest {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserConversationsRequest {
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: Option<Uuid>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub started_at: Option<Timestamp>,
    /// `None` while the conversation is still active.
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub ended_at: Option<Timestamp>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub conversation_title: Option<String>,
}

/// A message within a conversation, flattened for display.
///
/// `generated_context` is set for every message; `rag_context` only for bot
/// messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationMessageResponse {
    pub id: Option<Uuid>,
    pub message: Option<String>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub timestamp: Option<Timestamp>,
    pub sender: Option<SenderType>,
    pub message_type: Option<MessageType>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub intent: Option<String>,
    pub entities: Option<StructuredValue>,
    pub annotations: Option<StructuredValue>,
    pub source_event: Option<StructuredValue>,
    pub reply_to_message_id: Option<Uuid>,
    pub generated_context: Option<String>,
    pub rag_context: Option<String>,
    pub like_feedback: Option<bool>,
    pub dislike_feedback: Option<bool>,
    pub feedback_text: Option<String>,
    pub regeneration: Option<bool>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub feedback_updated_at: Option<Timestamp>,
    pub trulens_sync_status: Option<String>,
    pub trulens_total_tokens: Option<i64>,
    pub trulens_total_cost: Option<f64>,
    pub eval_record_id: Option<String>,
    pub eval_sync_status: Option<String>,
    pub eval_sync_error: Option<String>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub eval_sync_timestamp: Option<Timestamp>,
    pub eval_total_tokens: Option<i64>,
    pub eval_total_cost: Option<f64>,
    pub conversation_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EndConversationRequest {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndConversationResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub conversation_id: Option<Uuid>,
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub started_at: Option<Timestamp>,
    /// The backend omits the field rather than sending null when no end
    /// time was recorded.
    #[serde(deserialize_with = "crate::value::deserialize_timestamp")]
    pub ended_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn requests_skip_unset_fields() {
        let request = CreateAgentRequest {
            name: "Bot".to_string(),
            platform: "OpenAI".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Bot", "platform": "OpenAI"})
        );
    }

    #[test]
    fn sender_and_message_type_use_backend_casing() {
        let request = PlatformMessageSubmissionRequest {
            sender_type: Some(SenderType::Human),
            message_type: Some(MessageType::Text),
            reply_message_id: Some(Uuid::nil()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "senderType": "HUMAN",
                "messageType": "TEXT",
                "replyMessageId": "00000000-0000-0000-0000-000000000000"
            })
        );
    }

    #[test]
    fn unknown_sender_values_decode() {
        let msg: ConversationMessage =
            serde_json::from_value(json!({"sender": "SYSTEM", "message": "hi"})).unwrap();
        assert_eq!(msg.sender, Some(SenderType::Unknown));
    }

    #[test]
    fn platform_message_accepts_sender_type_key() {
        let msg: PlatformMessage = serde_json::from_value(json!({"senderType": "BOT"})).unwrap();
        assert_eq!(msg.sender, Some(SenderType::Bot));
    }

    #[test]
    fn end_conversation_without_end_time() {
        let response: EndConversationResponse = serde_json::from_value(json!({
            "success": true,
            "startedAt": "2024-05-01T12:30:00+00:00"
        }))
        .unwrap();
        assert_eq!(response.success, Some(true));
        assert!(response.started_at.is_some());
        assert!(response.ended_at.is_none());
    }

    #[test]
    fn feedback_request_serializes_only_given_flags() {
        let mut request = FeedbackSubmissionRequest::new(Uuid::nil());
        request.like = Some(true);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"messageId": "00000000-0000-0000-0000-000000000000", "like": true})
        );
    }
}
