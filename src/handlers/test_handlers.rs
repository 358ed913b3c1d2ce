use super::*;
use crate::config::Config;
use crate::models::{Language, TutorialRecord};
use crate::server::build_router;
use crate::transcript::MockTranscriptSource;
use crate::transport::{BedrockClient, MockLlmClient};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mockall::predicate;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tower::ServiceExt;

const TRANSCRIPT: &str = "Step one: open the console. Step two: create a bucket.";

fn model_output() -> String {
    let question = json!({
        "question": "Which service stores objects?",
        "question_type": "multiple_choice",
        "options": ["S3", "EC2", "IAM", "RDS"],
        "correct_answer": "S3",
        "explanation": "Buckets live in S3",
        "difficulty": "easy",
        "topic": "Storage"
    });
    json!({
        "title": "S3 Basics",
        "summary": "Creating a bucket.",
        "key_topics": ["s3"],
        "difficulty_level": "Beginner",
        "action_steps": ["open the console", "create a bucket"],
        "practice_questions": vec![question; 5]
    })
    .to_string()
}

fn tutorial() -> TutorialRecord {
    TutorialRecord {
        title: "S3 Basics".to_string(),
        summary: "Creating a bucket.".to_string(),
        key_topics: vec!["s3".to_string()],
        difficulty_level: "Beginner".to_string(),
        action_steps: vec!["open the console".to_string(), "create a bucket".to_string()],
        practice_questions: vec![],
        original_transcript: TRANSCRIPT.to_string(),
        source_url: None,
        target_language: Language::English,
        processing_time_secs: 0.0,
    }
}

fn app(llm: MockLlmClient, transcripts: MockTranscriptSource) -> Router {
    build_router(AppState::new(
        Arc::new(llm),
        Arc::new(transcripts),
        Arc::new(Config::default()),
    ))
}

fn app_with_llm(llm: MockLlmClient) -> Router {
    app(llm, MockTranscriptSource::new())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = send(app_with_llm(MockLlmClient::new()), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["message"], "TutorMate AI API is running!");
}

#[tokio::test]
async fn test_health_connected() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .with(predicate::always(), predicate::eq(10))
        .times(1)
        .returning(|_, _| Ok("OK".to_string()));

    let (status, body) = send(app_with_llm(llm), get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_status"], "healthy");
    assert_eq!(body["bedrock_status"], "connected");
    assert!(body["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));
}

#[tokio::test]
async fn test_health_degraded_when_model_unreachable() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .times(1)
        .returning(|_, _| Err(TutorError::UpstreamUnavailable("no route".into())));

    let (status, body) = send(app_with_llm(llm), get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_status"], "degraded");
    assert_eq!(body["bedrock_status"], "error");
}

#[tokio::test]
async fn test_process_tutorial_from_transcript() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .with(
            predicate::function(|p: &str| p.contains(TRANSCRIPT)),
            predicate::eq(4000),
        )
        .times(1)
        .returning(|_, _| Ok(model_output()));

    let (status, body) = send(
        app_with_llm(llm),
        post_json(
            "/api/process-tutorial",
            json!({"source": "transcript", "content": TRANSCRIPT}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action_steps"], json!(["open the console", "create a bucket"]));
    assert_eq!(body["original_transcript"], TRANSCRIPT);
    assert_eq!(body["target_language"], "english");
    assert_eq!(body["practice_questions"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn test_process_tutorial_from_url_uses_transcript_source() {
    let mut transcripts = MockTranscriptSource::new();
    transcripts
        .expect_fetch()
        .with(predicate::eq("dQw4w9WgXcQ"))
        .times(1)
        .returning(|_| Ok(TRANSCRIPT.to_string()));
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .times(1)
        .returning(|_, _| Ok(model_output()));

    let (status, body) = send(
        app(llm, transcripts),
        post_json(
            "/api/process-tutorial",
            json!({
                "source": "url",
                "content": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "target_language": "spanish"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert_eq!(body["target_language"], "spanish");
}

#[tokio::test]
async fn test_process_tutorial_invalid_url_is_bad_request() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke().times(0);

    let (status, body) = send(
        app_with_llm(llm),
        post_json(
            "/api/process-tutorial",
            json!({"source": "url", "content": "https://example.com/video"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_process_tutorial_short_transcript_is_bad_request() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke().times(0);

    let (status, _) = send(
        app_with_llm(llm),
        post_json(
            "/api/process-tutorial",
            json!({"source": "transcript", "content": "too short"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_process_tutorial_malformed_model_output() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .times(1)
        .returning(|_, _| Ok("I'd be happy to help with that tutorial!".to_string()));

    let (status, body) = send(
        app_with_llm(llm),
        post_json(
            "/api/process-tutorial",
            json!({"source": "transcript", "content": TRANSCRIPT}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_process_tutorial_upstream_unavailable() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .times(1)
        .returning(|_, _| Err(TutorError::UpstreamUnavailable("connection refused".into())));

    let (status, _) = send(
        app_with_llm(llm),
        post_json(
            "/api/process-tutorial",
            json!({"source": "transcript", "content": TRANSCRIPT}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/process-tutorial")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"source\": \"transcript\""))
        .unwrap();

    let (status, body) = send(app_with_llm(MockLlmClient::new()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_chat_returns_reply() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke()
        .with(
            predicate::function(|p: &str| p.contains("USER QUESTION: What comes first?")),
            predicate::eq(1000),
        )
        .times(1)
        .returning(|_, _| Ok("  Open the console.  ".to_string()));

    let (status, body) = send(
        app_with_llm(llm),
        post_json(
            "/api/chat",
            json!({
                "tutorial": tutorial(),
                "history": [{"role": "user", "text": "Hi"}, {"role": "assistant", "text": "Hello!"}],
                "message": "What comes first?"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Open the console.");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let mut llm = MockLlmClient::new();
    llm.expect_invoke().times(0);

    let (status, _) = send(
        app_with_llm(llm),
        post_json("/api/chat", json!({"tutorial": tutorial(), "message": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_sets_download_headers() {
    let response = app_with_llm(MockLlmClient::new())
        .oneshot(post_json(
            "/api/export",
            json!({"tutorial": tutorial(), "format": "checklist"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"S3_Basics_checklist.txt\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("open the console"));
}

#[tokio::test]
async fn test_export_non_ascii_title_gives_ascii_filename() {
    let mut record = tutorial();
    record.title = "Introducción a S3".to_string();

    let response = app_with_llm(MockLlmClient::new())
        .oneshot(post_json("/api/export", json!({"tutorial": record})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Introducci_n_a_S3.md\""
    );
}

#[tokio::test]
async fn test_export_unknown_format_is_bad_request() {
    let (status, _) = send(
        app_with_llm(MockLlmClient::new()),
        post_json("/api/export", json!({"tutorial": tutorial(), "format": "pdf"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn stalled_bedrock() -> String {
    let router = Router::new().route(
        "/model/:model/invoke",
        axum::routing::post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "{}"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_stalled_model_surfaces_as_bad_gateway() {
    let mut config = Config::default();
    config.bedrock.endpoint_url = Some(stalled_bedrock().await);
    config.bedrock.bearer_token = Some("test-token".to_string());
    let llm = BedrockClient::new(&config)
        .unwrap()
        .with_deadline(Duration::from_millis(200));
    let app = build_router(AppState::new(
        Arc::new(llm),
        Arc::new(MockTranscriptSource::new()),
        Arc::new(config),
    ));

    let started = Instant::now();
    let (status, _) = send(
        app.clone(),
        post_json(
            "/api/process-tutorial",
            json!({"source": "transcript", "content": TRANSCRIPT}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = send(
        app,
        post_json(
            "/api/chat",
            json!({"tutorial": tutorial(), "message": "What comes first?"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < Duration::from_secs(4));
}
