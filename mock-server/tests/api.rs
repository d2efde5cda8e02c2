use axum::{
    http::{self, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, AppState, SERVER_VERSION};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, key: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("Api-Key", key);
    }
    builder.body(body.to_string()).unwrap()
}

fn get_request(uri: &str, key: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header("Api-Key", key);
    }
    builder.body(String::new()).unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn register(app: &Router, project: &str) -> String {
    let resp = send(
        app,
        json_request(
            "POST",
            "/api/platform/register",
            None,
            &json!({ "projectName": project }).to_string(),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["apiKey"].as_str().unwrap().to_string()
}

fn human(text: &str) -> String {
    json!({
        "username": "alice",
        "email": "alice@example.com",
        "agentData": { "name": "Helper", "platform": "OpenAI", "version": "4.0" },
        "senderType": "HUMAN",
        "message": text,
        "messageType": "TEXT"
    })
    .to_string()
}

fn bot(reply_to: &str) -> String {
    json!({
        "username": "alice",
        "email": "alice@example.com",
        "agentData": { "name": "Helper", "platform": "OpenAI", "version": "4.0" },
        "senderType": "BOT",
        "message": "Hello back",
        "messageType": "TEXT",
        "replyMessageId": reply_to,
        "ragContext": "greeting docs"
    })
    .to_string()
}

// --- registration ---

#[tokio::test]
async fn register_issues_api_key_and_extra_fields() {
    let app = app();
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/platform/register",
            None,
            r#"{"projectName":"support","metadata":{"tier":"gold"}}"#,
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["apiKey"].as_str().unwrap().starts_with("pk_"));
    assert_eq!(body["projectName"], "support");
    assert_eq!(body["serverVersion"], SERVER_VERSION);
    assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn register_blank_project_returns_400() {
    let resp = send(
        &app(),
        json_request("POST", "/api/platform/register", None, r#"{"projectName":"  "}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "projectName is required");
}

#[tokio::test]
async fn register_twice_returns_400() {
    let app = app();
    register(&app, "dup").await;
    let resp = send(
        &app,
        json_request("POST", "/api/platform/register", None, r#"{"projectName":"dup"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- authentication ---

#[tokio::test]
async fn missing_api_key_returns_401() {
    let resp = send(&app(), get_request("/api/analytics/dashboard", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_api_key_returns_401() {
    let resp = send(&app(), get_request("/api/platform/messages", Some("pk_nope"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_endpoints_need_no_key() {
    let app = app();
    let resp = send(&app, get_request("/api/analytics/all?topLimit=3", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/analytics/initialize")
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["initialized"], true);
}

// --- users and agents ---

#[tokio::test]
async fn create_user_is_idempotent_per_username() {
    let app = app();
    let key = register(&app, "users").await;
    let body = r#"{"username":"bob","email":"bob@example.com"}"#;

    let first = body_json(send(&app, json_request("POST", "/api/users", Some(&key), body)).await).await;
    let second = body_json(send(&app, json_request("POST", "/api/users", Some(&key), body)).await).await;
    assert_eq!(first["userId"], second["userId"]);
    assert_eq!(first["projectName"], "users");
}

#[tokio::test]
async fn create_agent_requires_platform() {
    let app = app();
    let key = register(&app, "agents").await;
    let resp = send(
        &app,
        json_request("POST", "/api/agents", Some(&key), r#"{"name":"Helper"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- messages ---

#[tokio::test]
async fn get_message_not_found() {
    let app = app();
    let key = register(&app, "missing").await;
    let resp = send(
        &app,
        get_request(
            "/api/platform/messages/00000000-0000-0000-0000-000000000000",
            Some(&key),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_message_bad_uuid_returns_400() {
    let app = app();
    let key = register(&app, "baduuid").await;
    let resp = send(&app, get_request("/api/platform/messages/not-a-uuid", Some(&key))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bot_message_for_unknown_reply_returns_404() {
    let app = app();
    let key = register(&app, "orphan").await;
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/platform/messages/submit",
            Some(&key),
            &bot("00000000-0000-0000-0000-000000000000"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_on_human_message_returns_400() {
    let app = app();
    let key = register(&app, "fb").await;
    let resp = send(
        &app,
        json_request("POST", "/api/platform/messages/submit", Some(&key), &human("Hi")),
    )
    .await;
    let id = body_json(resp).await["messageId"].as_str().unwrap().to_string();

    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/analytics/data",
            Some(&key),
            &json!({ "messageId": id, "like": true }).to_string(),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full conversation lifecycle ---

#[tokio::test]
async fn conversation_lifecycle() {
    let app = app();
    let key = register(&app, "lifecycle").await;

    // human message opens a conversation
    let resp = send(
        &app,
        json_request("POST", "/api/platform/messages/submit", Some(&key), &human("Hello")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let submitted = body_json(resp).await;
    assert_eq!(submitted["success"], true);
    assert_eq!(submitted["humanQuery"], "Hello");
    let human_id = submitted["messageId"].as_str().unwrap().to_string();
    let conversation_id = submitted["conversationId"].as_str().unwrap().to_string();

    // bot reply lands in the same conversation
    let resp = send(
        &app,
        json_request("POST", "/api/platform/messages/submit", Some(&key), &bot(&human_id)),
    )
    .await;
    let reply = body_json(resp).await;
    assert_eq!(reply["conversationId"], conversation_id.as_str());
    assert_eq!(reply["operationStatus"]["stored"], true);
    let bot_id = reply["messageId"].as_str().unwrap().to_string();

    // feedback
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/analytics/data",
            Some(&key),
            &json!({ "messageId": bot_id, "like": true, "feedback": "great" }).to_string(),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // conversation history, flattened
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/platform/conversation/getmessages",
            Some(&key),
            &json!({ "conversationId": conversation_id }).to_string(),
        ),
    )
    .await;
    let messages = body_json(resp).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0]["ragContext"].is_null());
    assert_eq!(messages[1]["ragContext"], "greeting docs");
    assert_eq!(messages[1]["likeFeedback"], true);

    // dashboard reflects the exchange
    let dashboard = body_json(send(&app, get_request("/api/analytics/dashboard", Some(&key))).await).await;
    assert_eq!(dashboard["totalQueries"], 1);
    assert_eq!(dashboard["totalResponses"], 1);
    assert_eq!(dashboard["likes"], 1);

    // active conversation has no end time
    let all = body_json(send(&app, get_request("/api/platform/conversations/all", Some(&key))).await).await;
    assert!(all[0].get("endedAt").is_none());

    // end it
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/platformsession/endconversation",
            Some(&key),
            &json!({ "conversationId": conversation_id }).to_string(),
        ),
    )
    .await;
    let ended = body_json(resp).await;
    assert_eq!(ended["success"], true);
    assert!(ended["endedAt"].is_string());

    let by_user = body_json(
        send(
            &app,
            json_request(
                "POST",
                "/api/platform/conversations/user",
                Some(&key),
                r#"{"username":"alice"}"#,
            ),
        )
        .await,
    )
    .await;
    assert!(by_user[0]["endedAt"].is_string());
}

// --- evaluation ---

#[tokio::test]
async fn batch_metrics_job_reports_progress() {
    let app = app();
    let resp = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/eval/sessions/generate-metrics-all")
            .body(String::new())
            .unwrap(),
    )
    .await;
    let job = body_json(resp).await;
    let job_id = job["jobId"].as_str().unwrap();

    let resp = send(
        &app,
        get_request(&format!("/api/eval/sessions/generate-metrics-all/{job_id}/progress"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "COMPLETED");

    let resp = send(
        &app,
        get_request("/api/eval/sessions/generate-metrics-all/unknown/progress", None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- request counting ---

#[tokio::test]
async fn every_request_is_counted() {
    let state = AppState::new();
    let app = app_with_state(state.clone());
    assert_eq!(state.request_count(), 0);

    let resp = send(&app, get_request("/api/analytics/dashboard", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    register(&app, "counted").await;

    assert_eq!(state.request_count(), 2);
}
