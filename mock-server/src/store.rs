//! In-memory records and their JSON renderings.
//!
//! Every record is scoped to the project that created it. Renderings add a
//! few fields the SDK does not model (`tenantId`, `createdAt`, ...) so client
//! tests exercise unknown-field tolerance.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) struct Project {
    pub id: i64,
    pub tenant_id: Uuid,
    pub name: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) struct UserRecord {
    pub id: Uuid,
    pub project: String,
    pub username: String,
    pub email: String,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

pub(crate) struct AgentRecord {
    pub id: Uuid,
    pub project: String,
    pub name: String,
    pub platform: String,
    pub version: Option<String>,
    pub metadata: Option<Value>,
}

pub(crate) struct ConversationRecord {
    pub id: Uuid,
    pub project: String,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
}

pub(crate) struct MessageRecord {
    pub id: Uuid,
    pub project: String,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub sender: String,
    pub message: String,
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    pub intent: Option<String>,
    pub entities: Option<Value>,
    pub annotations: Option<Value>,
    pub source_event: Option<Value>,
    pub rag_context: Option<String>,
    pub reply_to: Option<Uuid>,
    pub mode: Option<String>,
    pub like: Option<bool>,
    pub dislike: Option<bool>,
    pub feedback_text: Option<String>,
    pub regeneration: Option<bool>,
    pub feedback_updated_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn is_bot(&self) -> bool {
        self.sender == "BOT"
    }
}

pub(crate) struct EvalJob {
    pub total: usize,
}

#[derive(Default)]
pub(crate) struct Db {
    pub projects: HashMap<String, Project>,
    pub users: Vec<UserRecord>,
    pub agents: Vec<AgentRecord>,
    pub conversations: Vec<ConversationRecord>,
    pub messages: Vec<MessageRecord>,
    pub jobs: HashMap<String, EvalJob>,
    pub analytics_initialized: bool,
}

impl Db {
    pub fn project_by_key(&self, key: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.api_key == key)
    }

    pub fn user(&self, id: Uuid) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn agent(&self, id: Uuid) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn conversation(&self, project: &str, id: Uuid) -> Option<&ConversationRecord> {
        self.conversations
            .iter()
            .find(|c| c.id == id && c.project == project)
    }

    pub fn message(&self, project: &str, id: Uuid) -> Option<&MessageRecord> {
        self.messages
            .iter()
            .find(|m| m.id == id && m.project == project)
    }

    /// Find a user by username within a project, creating it if needed.
    pub fn upsert_user(&mut self, project: &str, username: &str, email: &str, metadata: Option<Value>) -> Uuid {
        if let Some(user) = self
            .users
            .iter()
            .find(|u| u.project == project && u.username == username)
        {
            return user.id;
        }
        let id = Uuid::new_v4();
        self.users.push(UserRecord {
            id,
            project: project.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            metadata,
            created_at: Utc::now(),
        });
        id
    }

    /// Find an agent by name within a project, creating it if needed.
    pub fn upsert_agent(
        &mut self,
        project: &str,
        name: &str,
        platform: &str,
        version: Option<String>,
        metadata: Option<Value>,
    ) -> Uuid {
        if let Some(agent) = self
            .agents
            .iter()
            .find(|a| a.project == project && a.name == name)
        {
            return agent.id;
        }
        let id = Uuid::new_v4();
        self.agents.push(AgentRecord {
            id,
            project: project.to_string(),
            name: name.to_string(),
            platform: platform.to_string(),
            version,
            metadata,
        });
        id
    }

    /// The open conversation between a user and an agent, started on demand.
    pub fn active_conversation(&mut self, project: &str, user_id: Uuid, agent_id: Uuid, first_message: &str) -> Uuid {
        if let Some(conv) = self.conversations.iter().find(|c| {
            c.project == project && c.user_id == user_id && c.agent_id == agent_id && c.ended_at.is_none()
        }) {
            return conv.id;
        }
        let id = Uuid::new_v4();
        let title: String = first_message.chars().take(40).collect();
        self.conversations.push(ConversationRecord {
            id,
            project: project.to_string(),
            user_id,
            agent_id,
            started_at: Utc::now(),
            ended_at: None,
            title: Some(title),
        });
        id
    }

    pub fn project_messages<'a>(&'a self, project: &'a str) -> impl Iterator<Item = &'a MessageRecord> + 'a {
        self.messages.iter().filter(move |m| m.project == project)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Renderings
    // ─────────────────────────────────────────────────────────────────────

    pub fn user_json(&self, user: &UserRecord) -> Value {
        json!({
            "userId": user.id,
            "username": user.username,
            "email": user.email,
            "projectName": user.project,
            "metadata": user.metadata,
            "createdAt": ts(user.created_at),
        })
    }

    pub fn agent_json(&self, agent: &AgentRecord) -> Value {
        json!({
            "id": agent.id,
            "name": agent.name,
            "platform": agent.platform,
            "version": agent.version,
            "projectName": agent.project,
            "metadata": agent.metadata,
            "status": "ACTIVE",
        })
    }

    /// Full entity form, relations inlined.
    pub fn message_entity_json(&self, msg: &MessageRecord) -> Value {
        let user = self.user(msg.user_id).map(|u| self.user_json(u));
        let agent = self.agent(msg.agent_id);
        let conversation = self
            .conversation(&msg.project, msg.conversation_id)
            .map(|c| self.conversation_summary_json(c));
        let reply = msg
            .reply_to
            .and_then(|id| self.message(&msg.project, id))
            .map(|m| json!({"id": m.id, "message": m.message, "timestamp": ts(m.timestamp)}));
        json!({
            "id": msg.id,
            "message": msg.message,
            "sender": msg.sender,
            "messageType": msg.message_type,
            "platformUser": user,
            "agent": agent.map(|a| self.agent_json(a)),
            "conversation": conversation,
            "replyToMessage": reply,
            "projectName": msg.project,
            "agentName": agent.map(|a| a.name.clone()),
            "mode": msg.mode,
            "timestamp": ts(msg.timestamp),
            "intent": msg.intent,
            "entities": msg.entities,
            "annotations": msg.annotations,
            "sourceEvent": msg.source_event,
            "ragContext": msg.rag_context,
            "generatedContext": format!("context for {}", msg.id),
            "likeFeedback": msg.like,
            "dislikeFeedback": msg.dislike,
            "feedbackText": msg.feedback_text,
            "regeneration": msg.regeneration,
            "feedbackUpdatedAt": msg.feedback_updated_at.map(ts),
            "tenantId": Uuid::nil(),
        })
    }

    /// Flattened form used by the conversation endpoints.
    pub fn conversation_message_json(&self, msg: &MessageRecord) -> Value {
        let user = self.user(msg.user_id);
        let agent = self.agent(msg.agent_id);
        let title = self
            .conversation(&msg.project, msg.conversation_id)
            .and_then(|c| c.title.clone());
        let rag_context = msg.rag_context.as_ref().filter(|_| msg.is_bot());
        json!({
            "id": msg.id,
            "message": msg.message,
            "timestamp": ts(msg.timestamp),
            "sender": msg.sender,
            "messageType": msg.message_type,
            "userId": msg.user_id,
            "username": user.map(|u| u.username.clone()),
            "agentId": msg.agent_id,
            "agentName": agent.map(|a| a.name.clone()),
            "intent": msg.intent,
            "entities": msg.entities,
            "annotations": msg.annotations,
            "sourceEvent": msg.source_event,
            "replyToMessageId": msg.reply_to,
            "generatedContext": format!("context for {}", msg.id),
            "ragContext": rag_context,
            "likeFeedback": msg.like,
            "dislikeFeedback": msg.dislike,
            "feedbackText": msg.feedback_text,
            "regeneration": msg.regeneration,
            "feedbackUpdatedAt": msg.feedback_updated_at.map(ts),
            "conversationTitle": title,
            "embeddingDimensions": 1536,
        })
    }

    /// Summary form. `endedAt` is omitted, not null, while active.
    pub fn conversation_summary_json(&self, conv: &ConversationRecord) -> Value {
        let mut out = json!({
            "conversationId": conv.id,
            "startedAt": ts(conv.started_at),
            "userId": conv.user_id,
            "username": self.user(conv.user_id).map(|u| u.username.clone()),
            "agentId": conv.agent_id,
            "agentName": self.agent(conv.agent_id).map(|a| a.name.clone()),
            "conversationTitle": conv.title,
            "messageCount": self.messages.iter().filter(|m| m.conversation_id == conv.id).count(),
        });
        if let Some(ended) = conv.ended_at {
            out["endedAt"] = json!(ts(ended));
        }
        out
    }

    // ─────────────────────────────────────────────────────────────────────
    // Analytics
    // ─────────────────────────────────────────────────────────────────────

    /// Seconds between each bot reply and the message it answers.
    fn response_times<'a>(&'a self, project: &'a str) -> impl Iterator<Item = (Uuid, f64)> + 'a {
        self.project_messages(project)
            .filter(|m| m.is_bot())
            .filter_map(move |bot| {
                let human = self.message(project, bot.reply_to?)?;
                let secs = (bot.timestamp - human.timestamp).num_milliseconds() as f64 / 1000.0;
                Some((human.user_id, secs))
            })
    }

    fn avg(values: impl Iterator<Item = f64>) -> f64 {
        let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    pub fn dashboard_json(&self, project: &str) -> Value {
        let msgs: Vec<&MessageRecord> = self.project_messages(project).collect();
        let likes = msgs.iter().filter(|m| m.like == Some(true)).count();
        let dislikes = msgs.iter().filter(|m| m.dislike == Some(true)).count();
        let regenerates = msgs.iter().filter(|m| m.regeneration == Some(true)).count();
        let feedback = msgs
            .iter()
            .filter(|m| m.like.is_some() || m.dislike.is_some() || m.feedback_text.is_some() || m.regeneration.is_some())
            .count();
        json!({
            "totalUsers": self.users.iter().filter(|u| u.project == project).count(),
            "totalAgents": self.agents.iter().filter(|a| a.project == project).count(),
            "totalQueries": msgs.iter().filter(|m| !m.is_bot()).count(),
            "totalResponses": msgs.iter().filter(|m| m.is_bot()).count(),
            "avgResponseTimeSeconds": Self::avg(self.response_times(project).map(|(_, s)| s)),
            "totalFeedback": feedback,
            "likes": likes,
            "dislikes": dislikes,
            "regenerates": regenerates,
            "computedAt": ts(Utc::now()),
        })
    }

    pub fn top_agents_json(&self, project: &str, limit: usize) -> Value {
        let mut rows: Vec<(&AgentRecord, usize, f64)> = self
            .agents
            .iter()
            .filter(|a| a.project == project)
            .map(|agent| {
                let msgs: Vec<&MessageRecord> = self
                    .project_messages(project)
                    .filter(|m| m.agent_id == agent.id)
                    .collect();
                let queries = msgs.iter().filter(|m| !m.is_bot()).count();
                let rated = msgs.iter().filter(|m| m.like.is_some() || m.dislike.is_some()).count();
                let liked = msgs.iter().filter(|m| m.like == Some(true)).count();
                let satisfaction = if rated == 0 { 0.0 } else { liked as f64 * 100.0 / rated as f64 };
                (agent, queries, satisfaction)
            })
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
        Value::Array(
            rows.into_iter()
                .take(limit)
                .enumerate()
                .map(|(i, (agent, queries, satisfaction))| {
                    json!({
                        "rank": i + 1,
                        "agentName": agent.name,
                        "agentId": agent.id,
                        "queryCount": queries,
                        "satisfactionPercentage": satisfaction,
                    })
                })
                .collect(),
        )
    }

    fn user_rows(&self, project: &str) -> Vec<(&UserRecord, usize, usize, f64, [usize; 3])> {
        self.users
            .iter()
            .filter(|u| u.project == project)
            .map(|user| {
                let msgs: Vec<&MessageRecord> = self
                    .project_messages(project)
                    .filter(|m| m.user_id == user.id)
                    .collect();
                let queries = msgs.iter().filter(|m| !m.is_bot()).count();
                let responses = msgs.iter().filter(|m| m.is_bot()).count();
                let avg = Self::avg(
                    self.response_times(project)
                        .filter(|(uid, _)| *uid == user.id)
                        .map(|(_, s)| s),
                );
                let feedback = [
                    msgs.iter().filter(|m| m.like == Some(true)).count(),
                    msgs.iter().filter(|m| m.dislike == Some(true)).count(),
                    msgs.iter().filter(|m| m.regeneration == Some(true)).count(),
                ];
                (user, queries, responses, avg, feedback)
            })
            .collect()
    }

    pub fn top_users_json(&self, project: &str, limit: usize) -> Value {
        let mut rows = self.user_rows(project);
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.username.cmp(&b.0.username)));
        Value::Array(
            rows.into_iter()
                .take(limit)
                .enumerate()
                .map(|(i, (user, queries, _, avg, _))| {
                    json!({
                        "rank": i + 1,
                        "username": user.username,
                        "email": user.email,
                        "userId": user.id,
                        "queryCount": queries,
                        "avgResponseTimeSeconds": avg,
                    })
                })
                .collect(),
        )
    }

    pub fn user_analytics_json(&self, project: &str) -> Value {
        Value::Array(
            self.user_rows(project)
                .into_iter()
                .map(|(user, queries, responses, avg, [likes, dislikes, regenerates])| {
                    json!({
                        "username": user.username,
                        "email": user.email,
                        "userId": user.id,
                        "queries": queries,
                        "responses": responses,
                        "avgResponseTimeSeconds": avg,
                        "likes": likes,
                        "dislikes": dislikes,
                        "regenerates": regenerates,
                    })
                })
                .collect(),
        )
    }
}
