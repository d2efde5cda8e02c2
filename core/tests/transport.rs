//! Transport behavior against scripted HTTP responses.
//!
//! # Design
//! Each test mounts canned responses on a wiremock server, so status codes,
//! malformed payloads and header expectations can be pinned exactly. Mocks
//! mounted with `.expect(n)` are verified when the server is dropped.

use serde_json::json;
use shiftai_core::{
    ApiErrorKind, CreateUserRequest, Endpoint, HumanMessage, PlatformMessageSubmissionResponse,
    PlatformRegistrationRequest, ResultShape, ShiftAiClient, StructuredValue, User,
};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "pk_test";

fn authed(server: &MockServer) -> ShiftAiClient {
    ShiftAiClient::new(&server.uri(), Some(KEY.to_string())).unwrap()
}

fn anonymous(server: &MockServer) -> ShiftAiClient {
    ShiftAiClient::new(&server.uri(), None).unwrap()
}

fn alice() -> CreateUserRequest {
    CreateUserRequest {
        username: "alice".to_string(),
        email: "a@x.com".to_string(),
        metadata: None,
    }
}

async fn respond(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(path(route)).respond_with(template).mount(server).await;
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn statuses_map_to_failure_kinds() {
    let cases: [(u16, ApiErrorKind); 6] = [
        (401, ApiErrorKind::Unauthorized),
        (400, ApiErrorKind::BadRequest),
        (404, ApiErrorKind::NotFound),
        (500, ApiErrorKind::Server),
        (503, ApiErrorKind::Server),
        (418, ApiErrorKind::Generic),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        respond(
            &server,
            "/api/analytics/dashboard",
            ResponseTemplate::new(status).set_body_string(format!("status {status}")),
        )
        .await;

        let err = authed(&server).analytics().dashboard().await.unwrap_err();
        let api = err.as_api().unwrap_or_else(|| panic!("{status}: not an API error"));
        assert_eq!(api.kind(), kind, "{status}: kind");
        assert_eq!(api.status(), status, "{status}: status");
        assert_eq!(api.body(), Some(format!("status {status}").as_str()), "{status}: body");
    }
}

#[tokio::test]
async fn error_rendering_includes_status_message_and_body() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/api/users",
        ResponseTemplate::new(400).set_body_json(json!({ "error": "email is required" })),
    )
    .await;

    let err = authed(&server)
        .users()
        .create(alice())
        .await
        .unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.starts_with("API error 400: Bad Request"), "{rendered}");
    assert!(rendered.contains("\nResponse: "), "{rendered}");
    assert!(rendered.contains("email is required"), "{rendered}");
}

#[tokio::test]
async fn generic_status_message_names_the_status() {
    let server = MockServer::start().await;
    respond(&server, "/api/platform/conversations/all", ResponseTemplate::new(409)).await;

    let err = authed(&server).conversations().all().await.unwrap_err();
    let api = err.as_api().unwrap();
    assert_eq!(api.message(), "API request failed with status 409");
    assert_eq!(api.body(), None);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_fields_are_dropped() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    respond(
        &server,
        "/api/users",
        ResponseTemplate::new(200).set_body_json(json!({
            "userId": user_id,
            "username": "alice",
            "email": "a@x.com",
            "favouriteColour": "teal",
            "createdAt": "2024-05-01T12:30:00Z"
        })),
    )
    .await;

    let user: User = authed(&server)
        .users()
        .create(alice())
        .await
        .unwrap();
    assert_eq!(user.user_id, Some(user_id));
    assert_eq!(user.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn list_endpoint_rejects_object_payload() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/api/platform/messages",
        ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })),
    )
    .await;

    let err = authed(&server).messages().get_all().await.unwrap_err();
    let api = err.as_api().unwrap();
    assert_eq!(api.kind(), ApiErrorKind::Generic);
    assert_eq!(api.status(), 0);
    assert_eq!(api.message(), "Expected list, got object");
}

#[tokio::test]
async fn malformed_json_is_a_generic_failure() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/api/analytics/dashboard",
        ResponseTemplate::new(200).set_body_string("{not json"),
    )
    .await;

    let err = authed(&server).analytics().dashboard().await.unwrap_err();
    let api = err.as_api().unwrap();
    assert_eq!(api.kind(), ApiErrorKind::Generic);
    assert_eq!(api.status(), 0);
    assert!(api.message().starts_with("IO error: "));
}

#[tokio::test]
async fn nested_timestamps_are_coerced() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/api/platformsession/initiate",
        ResponseTemplate::new(200).set_body_json(json!({
            "session": {
                "startedAt": "2024-05-01T12:30:00Z",
                "events": [
                    { "at": "2024-05-01T12:31:00.123+02:00" },
                    { "at": "2024-05-01 12:32:00" }
                ]
            },
            "day": "2024-05-01",
            "label": "not a date"
        })),
    )
    .await;

    let value = authed(&server).platform_session().initiate(None).await.unwrap();
    let session = value.get("session").unwrap();
    let started = session.get("startedAt").unwrap().as_datetime().unwrap();
    assert_eq!(started.to_rfc3339(), "2024-05-01T12:30:00+00:00");

    let events = session.get("events").unwrap().as_array().unwrap();
    let first = events[0].get("at").unwrap().as_datetime().unwrap();
    assert_eq!(first.offset().local_minus_utc(), 2 * 3600);
    assert!(events[1].get("at").unwrap().as_datetime().is_some());

    assert_eq!(value.get("day").unwrap().as_str(), Some("2024-05-01"));
    assert_eq!(value.get("label").unwrap().as_str(), Some("not a date"));

    let again = value.clone().coerce_timestamps();
    assert_eq!(again, value);
}

#[tokio::test]
async fn empty_raw_body_decodes_as_null() {
    let server = MockServer::start().await;
    respond(&server, "/api/analytics/initialize", ResponseTemplate::new(200)).await;

    let value = anonymous(&server).analytics().initialize().await.unwrap();
    assert_eq!(value, StructuredValue::Null);
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submission_round_trip() {
    let server = MockServer::start().await;
    let message_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/platform/messages/submit"))
        .and(header("Api-Key", KEY))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "username": "alice",
            "email": "a@x.com",
            "agentData": { "name": "Bot", "platform": "OpenAI", "version": "1.0" },
            "senderType": "HUMAN",
            "message": "hi",
            "messageType": "TEXT"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "messageId": message_id,
            "conversationId": conversation_id
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response: PlatformMessageSubmissionResponse = authed(&server)
        .messages()
        .send_human_message(HumanMessage::new("alice", "hi", "Bot", "OpenAI", "1.0", "a@x.com"))
        .await
        .unwrap();
    assert_eq!(response.success, Some(true));
    assert_eq!(response.message_id, Some(message_id));
    assert_eq!(response.conversation_id, Some(conversation_id));
    assert!(response.message.is_none());
}

#[tokio::test]
async fn registration_is_sent_without_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/platform/register"))
        .and(body_json(json!({ "projectName": "demo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiKey": "pk_new",
            "projectName": "demo",
            "createdAt": "2024-05-01T12:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // A configured key must still not be attached to an anonymous endpoint.
    let registration = authed(&server)
        .platform()
        .register(PlatformRegistrationRequest {
            project_name: "demo".to_string(),
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(registration.api_key.as_deref(), Some("pk_new"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("api-key").is_none());
}

#[tokio::test]
async fn query_parameters_carry_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/top-agents"))
        .and(query_param("limit", "3"))
        .and(header("Api-Key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "rank": 1, "agentName": "Helper", "queryCount": 7, "satisfactionPercentage": 85.5 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let top = authed(&server).analytics().top_agents(3).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].query_count, Some(7));
    assert_eq!(top[0].satisfaction_percentage, Some(85.5));
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(path("/api/analytics/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = anonymous(&server).analytics().dashboard().await.unwrap_err();
    assert!(err.is_precondition());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn shape_mismatch_is_a_precondition() {
    let server = MockServer::start().await;
    let client = authed(&server);
    let endpoint = Endpoint::get("/api/analytics/dashboard").with_shape(ResultShape::List);

    let err = client
        .transport()
        .call_object::<User, ()>(&endpoint, None)
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn connection_failure_is_status_zero() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ShiftAiClient::new(&format!("http://{addr}"), Some(KEY.to_string())).unwrap();
    let err = client.analytics().dashboard().await.unwrap_err();
    let api = err.as_api().unwrap();
    assert_eq!(api.kind(), ApiErrorKind::Generic);
    assert_eq!(api.status(), 0);
    assert!(api.message().starts_with("IO error: "));
}

#[tokio::test]
async fn job_id_is_encoded_as_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/eval/sessions/generate-metrics-all/a%2Fb%3Fc/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "RUNNING" })))
        .expect(1)
        .mount(&server)
        .await;

    let progress = anonymous(&server)
        .internal()
        .eval()
        .batch_progress("a/b?c")
        .await
        .unwrap();
    assert_eq!(progress.get("status").and_then(|s| s.as_str()), Some("RUNNING"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn text_fields_are_not_rewritten_as_timestamps() {
    let server = MockServer::start().await;
    let conversation_id = Uuid::new_v4();
    respond(
        &server,
        "/api/platform/conversation/getmessages",
        ResponseTemplate::new(200).set_body_json(json!([{
            "message": "2024-05-01 12:30:00",
            "ragContext": "2024-05-01T12:30:00.250",
            "timestamp": "2024-05-01T12:30:00Z"
        }])),
    )
    .await;

    let history = authed(&server)
        .conversations()
        .messages(conversation_id)
        .await
        .unwrap();
    assert_eq!(history[0].message.as_deref(), Some("2024-05-01 12:30:00"));
    assert_eq!(history[0].rag_context.as_deref(), Some("2024-05-01T12:30:00.250"));
    assert!(history[0].timestamp.is_some());
}
