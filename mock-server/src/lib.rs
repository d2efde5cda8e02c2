//! In-memory stand-in for the ShiftAI platform backend.
//!
//! Serves the HTTP/JSON endpoints the SDK calls, authenticates with the
//! `Api-Key` header issued by project registration, and counts every request
//! it receives so tests can assert that a call never reached the wire.

mod store;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use store::{ts, Db, EvalJob, MessageRecord, Project};

/// Header carrying the project API key.
pub const API_KEY_HEADER: &str = "api-key";

/// Version string reported in responses as an extra, unmodelled field.
pub const SERVER_VERSION: &str = "mock-1";

type Failure = (StatusCode, Json<Value>);
type Reply = Result<Json<Value>, Failure>;

/// Shared server state. Clones observe the same data and request counter.
#[derive(Clone, Default)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    requests: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received so far, on any route.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/platform/register", post(register))
        .route("/api/users", post(create_user))
        .route("/api/agents", post(create_agent))
        .route("/api/platform/messages", get(list_messages))
        .route("/api/platform/messages/submit", post(submit_message))
        .route("/api/platform/messages/{id}", get(get_message))
        .route("/api/platform/messages/agent/{id}", get(messages_by_agent))
        .route("/api/analytics/data", post(submit_feedback))
        .route("/api/analytics/dashboard", get(dashboard))
        .route("/api/analytics/top-agents", get(top_agents))
        .route("/api/analytics/top-users", get(top_users))
        .route("/api/analytics/user-analytics", get(user_analytics))
        .route("/api/analytics/project-data", get(project_data))
        .route("/api/analytics/all", get(all_projects))
        .route("/api/analytics/initialize", post(initialize_analytics))
        .route("/api/platform/conversation/getmessages", post(conversation_messages))
        .route("/api/platform/conversations/all", get(all_conversations))
        .route("/api/platform/conversations/user", post(user_conversations))
        .route("/api/platformsession/initiate", post(initiate_session))
        .route("/api/platformsession/endconversation", post(end_conversation))
        .route("/api/eval/sessions/generate-metrics", post(generate_all_session_metrics))
        .route("/api/eval/sessions/{id}/generate-metrics", post(generate_session_metrics))
        .route("/api/eval/sessions/generate-metrics-all", post(generate_all_conversation_metrics))
        .route("/api/eval/sessions/generate-metrics-all/{job_id}/progress", get(batch_progress))
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock ShiftAI backend listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    debug!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn failure(status: StatusCode, message: &str) -> Failure {
    if status.is_server_error() {
        warn!(%status, reason = message, "request failed");
    }
    (status, Json(json!({ "status": status.as_u16(), "error": message })))
}

fn bad_request(message: &str) -> Failure {
    failure(StatusCode::BAD_REQUEST, message)
}

fn not_found(message: &str) -> Failure {
    failure(StatusCode::NOT_FOUND, message)
}

/// Resolve the calling project from the `Api-Key` header.
fn authenticate(headers: &HeaderMap, db: &Db) -> Result<String, Failure> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "missing Api-Key header"))?;
    db.project_by_key(key)
        .map(|p| p.name.clone())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "invalid API key"))
}

/// Non-blank text field or 400.
fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Failure> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request(&format!("{name} is required")))
}

fn with_version(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert("serverVersion".to_string(), json!(SERVER_VERSION));
    }
    value
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct LimitQuery {
    limit: Option<usize>,
    top_limit: Option<usize>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration, users, agents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RegisterBody {
    project_name: Option<String>,
    metadata: Option<Value>,
}

async fn register(State(state): State<AppState>, Json(body): Json<RegisterBody>) -> Reply {
    let name = required(&body.project_name, "projectName")?.to_string();
    let mut db = state.db.write().await;
    if db.projects.contains_key(&name) {
        return Err(bad_request("project already registered"));
    }
    let project = Project {
        id: db.projects.len() as i64 + 1,
        tenant_id: Uuid::new_v4(),
        name: name.clone(),
        api_key: format!("pk_{}", Uuid::new_v4().simple()),
        created_at: Utc::now(),
    };
    let reply = json!({
        "id": project.id,
        "tenantId": project.tenant_id.to_string(),
        "projectName": &project.name,
        "apiKey": &project.api_key,
        "createdAt": ts(project.created_at),
        "message": "Platform registered successfully",
        "metadata": body.metadata,
    });
    info!(project = %name, "registered project");
    db.projects.insert(name, project);
    Ok(Json(with_version(reply)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserBody {
    username: Option<String>,
    email: Option<String>,
    metadata: Option<Value>,
}

async fn create_user(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<UserBody>) -> Reply {
    let mut db = state.db.write().await;
    let project = authenticate(&headers, &db)?;
    let username = required(&body.username, "username")?;
    let email = required(&body.email, "email")?;
    let id = db.upsert_user(&project, username, email, body.metadata.clone());
    let user = db.user(id).map(|u| db.user_json(u)).unwrap_or(Value::Null);
    Ok(Json(with_version(user)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AgentBody {
    name: Option<String>,
    platform: Option<String>,
    version: Option<String>,
    metadata: Option<Value>,
}

async fn create_agent(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<AgentBody>) -> Reply {
    let mut db = state.db.write().await;
    let project = authenticate(&headers, &db)?;
    let name = required(&body.name, "name")?;
    let platform = required(&body.platform, "platform")?;
    let id = db.upsert_agent(&project, name, platform, body.version.clone(), body.metadata.clone());
    let agent = db.agent(id).map(|a| db.agent_json(a)).unwrap_or(Value::Null);
    Ok(Json(with_version(agent)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct AgentDataBody {
    name: Option<String>,
    platform: Option<String>,
    version: Option<String>,
    metadata: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SubmitBody {
    username: Option<String>,
    email: Option<String>,
    metadata: Option<Value>,
    agent_data: Option<AgentDataBody>,
    sender_type: Option<String>,
    message: Option<String>,
    intent: Option<String>,
    entities: Option<Value>,
    annotations: Option<Value>,
    message_type: Option<String>,
    source_event: Option<Value>,
    rag_context: Option<String>,
    reply_message_id: Option<Uuid>,
    mode: Option<String>,
}

async fn submit_message(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<SubmitBody>) -> Reply {
    let mut db = state.db.write().await;
    let project = authenticate(&headers, &db)?;
    let username = required(&body.username, "username")?.to_string();
    let text = required(&body.message, "message")?.to_string();
    let agent_data = body
        .agent_data
        .as_ref()
        .ok_or_else(|| bad_request("agentData is required"))?;
    let agent_name = required(&agent_data.name, "agentData.name")?.to_string();
    let agent_platform = required(&agent_data.platform, "agentData.platform")?.to_string();
    let sender = match body.sender_type.as_deref() {
        Some("HUMAN") => "HUMAN",
        Some("BOT") => "BOT",
        _ => return Err(bad_request("senderType must be HUMAN or BOT")),
    };

    let email = body.email.clone().unwrap_or_default();
    let user_id = db.upsert_user(&project, &username, &email, body.metadata.clone());
    let agent_id = db.upsert_agent(
        &project,
        &agent_name,
        &agent_platform,
        agent_data.version.clone(),
        agent_data.metadata.clone(),
    );

    let conversation_id = if sender == "BOT" {
        let reply_id = body
            .reply_message_id
            .ok_or_else(|| bad_request("replyMessageId is required for bot messages"))?;
        db.message(&project, reply_id)
            .map(|m| m.conversation_id)
            .ok_or_else(|| not_found("reply message not found"))?
    } else {
        db.active_conversation(&project, user_id, agent_id, &text)
    };

    let previous: Vec<Value> = db
        .project_messages(&project)
        .filter(|m| m.conversation_id == conversation_id)
        .map(|m| json!([{ "sender": m.sender, "message": m.message }]))
        .collect();

    let id = Uuid::new_v4();
    db.messages.push(MessageRecord {
        id,
        project: project.clone(),
        conversation_id,
        user_id,
        agent_id,
        sender: sender.to_string(),
        message: text.clone(),
        message_type: body.message_type.clone().unwrap_or_else(|| "TEXT".to_string()),
        timestamp: Utc::now(),
        intent: body.intent.clone(),
        entities: body.entities.clone(),
        annotations: body.annotations.clone(),
        source_event: body.source_event.clone(),
        rag_context: body.rag_context.clone(),
        reply_to: body.reply_message_id,
        mode: body.mode.clone(),
        like: None,
        dislike: None,
        feedback_text: None,
        regeneration: None,
        feedback_updated_at: None,
    });
    debug!(%id, %conversation_id, sender, "stored message");

    let title = db
        .conversation(&project, conversation_id)
        .and_then(|c| c.title.clone());
    let turns = previous.len();
    let mut reply = json!({
        "success": true,
        "messageId": id,
        "conversationId": conversation_id,
        "conversationTitle": title,
        "previousKConversations": previous,
        "contextualPrompt": { "builtAt": ts(Utc::now()), "turns": turns },
    });
    if sender == "HUMAN" {
        reply["humanQuery"] = json!(text);
        reply["similarConversations"] = json!([]);
    } else {
        reply["operationStatus"] = json!({ "stored": true, "embedded": true });
    }
    Ok(Json(with_version(reply)))
}

async fn list_messages(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let messages: Vec<Value> = db
        .project_messages(&project)
        .map(|m| db.message_entity_json(m))
        .collect();
    Ok(Json(Value::Array(messages)))
}

async fn get_message(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let message = db
        .message(&project, id)
        .ok_or_else(|| not_found("message not found"))?;
    Ok(Json(db.message_entity_json(message)))
}

async fn messages_by_agent(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let messages: Vec<Value> = db
        .project_messages(&project)
        .filter(|m| m.agent_id == id)
        .map(|m| db.message_entity_json(m))
        .collect();
    Ok(Json(Value::Array(messages)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback and analytics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct FeedbackBody {
    message_id: Option<Uuid>,
    like: Option<bool>,
    dislike: Option<bool>,
    feedback: Option<String>,
    regeneration: Option<bool>,
}

async fn submit_feedback(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<FeedbackBody>) -> Reply {
    let mut db = state.db.write().await;
    let project = authenticate(&headers, &db)?;
    let id = body.message_id.ok_or_else(|| bad_request("messageId is required"))?;
    let message = db
        .messages
        .iter_mut()
        .find(|m| m.id == id && m.project == project)
        .ok_or_else(|| not_found("message not found"))?;
    if !message.is_bot() {
        return Err(bad_request("feedback can only be given on bot messages"));
    }
    message.like = body.like.or(message.like);
    message.dislike = body.dislike.or(message.dislike);
    message.feedback_text = body.feedback.or(message.feedback_text.take());
    message.regeneration = body.regeneration.or(message.regeneration);
    message.feedback_updated_at = Some(Utc::now());
    Ok(Json(with_version(json!({
        "success": true,
        "message": "Feedback recorded",
        "botMessageId": id,
    }))))
}

async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    Ok(Json(with_version(db.dashboard_json(&project))))
}

async fn top_agents(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<LimitQuery>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    Ok(Json(db.top_agents_json(&project, query.limit.unwrap_or(5))))
}

async fn top_users(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<LimitQuery>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    Ok(Json(db.top_users_json(&project, query.limit.unwrap_or(5))))
}

async fn user_analytics(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    Ok(Json(db.user_analytics_json(&project)))
}

async fn project_data(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<LimitQuery>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let mut data = db.dashboard_json(&project);
    data["topUserActivity"] = db.top_users_json(&project, query.top_limit.unwrap_or(10));
    data["topDevicesByUsage"] = json!([]);
    Ok(Json(with_version(data)))
}

async fn all_projects(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Reply {
    let db = state.db.read().await;
    let mut projects: Vec<(&str, usize)> = db
        .projects
        .keys()
        .map(|name| (name.as_str(), db.project_messages(name).count()))
        .collect();
    projects.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top: Vec<Value> = projects
        .iter()
        .take(query.top_limit.unwrap_or(10))
        .map(|(name, count)| json!({ "projectName": name, "totalMessages": count }))
        .collect();
    Ok(Json(json!({
        "totalProjects": db.projects.len(),
        "totalMessages": db.messages.len(),
        "generatedAt": ts(Utc::now()),
        "topProjects": top,
    })))
}

async fn initialize_analytics(State(state): State<AppState>) -> Reply {
    let mut db = state.db.write().await;
    let already = db.analytics_initialized;
    db.analytics_initialized = true;
    Ok(Json(json!({
        "initialized": true,
        "alreadyInitialized": already,
        "initializedAt": ts(Utc::now()),
    })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations and sessions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ConversationBody {
    conversation_id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UsernameBody {
    username: Option<String>,
}

async fn conversation_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConversationBody>,
) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let id = body
        .conversation_id
        .ok_or_else(|| bad_request("conversationId is required"))?;
    db.conversation(&project, id)
        .ok_or_else(|| not_found("conversation not found"))?;
    let messages: Vec<Value> = db
        .project_messages(&project)
        .filter(|m| m.conversation_id == id)
        .map(|m| db.conversation_message_json(m))
        .collect();
    Ok(Json(Value::Array(messages)))
}

async fn all_conversations(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let conversations: Vec<Value> = db
        .conversations
        .iter()
        .filter(|c| c.project == project)
        .map(|c| db.conversation_summary_json(c))
        .collect();
    Ok(Json(Value::Array(conversations)))
}

async fn user_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UsernameBody>,
) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let username = required(&body.username, "username")?;
    let conversations: Vec<Value> = db
        .conversations
        .iter()
        .filter(|c| c.project == project)
        .filter(|c| db.user(c.user_id).is_some_and(|u| u.username == username))
        .map(|c| db.conversation_summary_json(c))
        .collect();
    Ok(Json(Value::Array(conversations)))
}

async fn initiate_session(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    Ok(Json(with_version(json!({
        "sessionId": Uuid::new_v4(),
        "projectName": project,
        "status": "INITIATED",
        "startedAt": ts(Utc::now()),
        "request": body,
    }))))
}

async fn end_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConversationBody>,
) -> Reply {
    let mut db = state.db.write().await;
    let project = authenticate(&headers, &db)?;
    let id = body
        .conversation_id
        .ok_or_else(|| bad_request("conversationId is required"))?;
    let conversation = db
        .conversations
        .iter_mut()
        .find(|c| c.id == id && c.project == project)
        .ok_or_else(|| not_found("conversation not found"))?;
    let ended_at = *conversation.ended_at.get_or_insert_with(Utc::now);
    Ok(Json(with_version(json!({
        "success": true,
        "message": "Conversation ended",
        "conversationId": id,
        "startedAt": ts(conversation.started_at),
        "endedAt": ts(ended_at),
    }))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation
// ─────────────────────────────────────────────────────────────────────────────

async fn generate_session_metrics(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    db.conversation(&project, id)
        .ok_or_else(|| not_found("session not found"))?;
    Ok(Json(json!({
        "conversationId": id,
        "status": "QUEUED",
        "queuedAt": ts(Utc::now()),
    })))
}

async fn generate_all_session_metrics(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let project = authenticate(&headers, &db)?;
    let queued = db.conversations.iter().filter(|c| c.project == project).count();
    Ok(Json(json!({ "status": "QUEUED", "queued": queued })))
}

async fn generate_all_conversation_metrics(State(state): State<AppState>) -> Reply {
    let mut db = state.db.write().await;
    let job_id = Uuid::new_v4().to_string();
    let total = db.conversations.len();
    db.jobs.insert(job_id.clone(), EvalJob { total });
    info!(%job_id, total, "started metrics batch");
    Ok(Json(json!({
        "jobId": job_id,
        "status": "STARTED",
        "startedAt": ts(Utc::now()),
        "total": total,
    })))
}

async fn batch_progress(State(state): State<AppState>, Path(job_id): Path<String>) -> Reply {
    let db = state.db.read().await;
    let job = db.jobs.get(&job_id).ok_or_else(|| not_found("job not found"))?;
    Ok(Json(json!({
        "jobId": job_id,
        "status": "COMPLETED",
        "processed": job.total,
        "total": job.total,
        "updatedAt": ts(Utc::now()),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_body_accepts_partial_payloads() {
        let body: SubmitBody = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(body.username.as_deref(), Some("alice"));
        assert!(body.agent_data.is_none());
        assert!(body.reply_message_id.is_none());
    }

    #[test]
    fn required_rejects_blank_text() {
        let (status, _) = required(&Some("   ".to_string()), "username").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(required(&None, "username").is_err());
        assert_eq!(required(&Some(" bob ".to_string()), "username").unwrap(), "bob");
    }

    #[test]
    fn with_version_only_touches_objects() {
        assert_eq!(with_version(json!([1])), json!([1]));
        assert_eq!(with_version(json!({}))["serverVersion"], SERVER_VERSION);
    }

    #[test]
    fn active_conversation_is_reused_until_ended() {
        let mut db = Db::default();
        let user = db.upsert_user("p", "alice", "a@x.com", None);
        let agent = db.upsert_agent("p", "Bot", "OpenAI", None, None);
        let first = db.active_conversation("p", user, agent, "hi");
        assert_eq!(db.active_conversation("p", user, agent, "again"), first);

        db.conversations[0].ended_at = Some(Utc::now());
        assert_ne!(db.active_conversation("p", user, agent, "new"), first);
    }

    #[test]
    fn summary_omits_end_time_while_active() {
        let mut db = Db::default();
        let user = db.upsert_user("p", "alice", "a@x.com", None);
        let agent = db.upsert_agent("p", "Bot", "OpenAI", None, None);
        db.active_conversation("p", user, agent, "hi");
        let summary = db.conversation_summary_json(&db.conversations[0]);
        assert!(summary.get("endedAt").is_none());
        assert_eq!(summary["username"], "alice");
    }
}
