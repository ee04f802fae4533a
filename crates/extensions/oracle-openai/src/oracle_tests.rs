use super::*;
use rvla_protocols::types::{EventKind, Observation};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

async fn oracle_for(server: &MockServer) -> OpenAIOracle {
    let config = OracleConfig {
        api_key: Some("test-key".to_string()),
        ..Default::default()
    };
    OpenAIOracle::new(&config).with_base_url(server.uri())
}

fn plan_request() -> PlanRequest {
    PlanRequest {
        goal: "read the heading".to_string(),
        observation: Some(Observation::new("https://example.com")),
        history: vec!["observe:https://example.com".to_string()],
        summarized: false,
        depth: 0,
        screenshot: None,
    }
}

#[test]
fn test_oracle_id_and_base_url() {
    let oracle = OpenAIOracle::new(&OracleConfig::default()).with_base_url("http://localhost:9/v1/");
    assert_eq!(DecisionOracle::id(&oracle), "openai");
    assert_eq!(SnippetExaminer::id(&oracle), "openai");
    assert_eq!(oracle.base_url(), "http://localhost:9/v1");
}

#[test]
fn test_parse_json_malformed() {
    let err = parse_json::<PlanDecision>("not json").unwrap_err();
    assert!(matches!(err, OracleError::Malformed(_)));
}

#[tokio::test]
async fn test_plan_next_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "max_tokens": 1000,
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"action_type":"act","reasoning":"open it","command":"navigate","target":"https://example.com/a"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let decision = oracle.plan_next_action(plan_request()).await.unwrap();
    assert_eq!(decision.action_type, "act");
    assert_eq!(decision.command.as_deref(), Some("navigate"));
    assert_eq!(decision.target.as_deref(), Some("https://example.com/a"));
}

#[tokio::test]
async fn test_plan_with_screenshot_sends_image_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"action_type":"done","reasoning":"visible"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let mut request = plan_request();
    request.screenshot = Some(Screenshot::from_base64("AAAA"));
    let decision = oracle.plan_next_action(request).await.unwrap();
    assert_eq!(decision.action_type, "done");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();
    let user = &body["messages"][1]["content"];
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(user[0]["type"], "text");
    assert_eq!(user[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    assert_eq!(user[1]["image_url"]["detail"], "high");
}

#[tokio::test]
async fn test_plan_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("  ")))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let err = oracle.plan_next_action(plan_request()).await.unwrap_err();
    assert!(matches!(err, OracleError::EmptyResponse));
}

#[tokio::test]
async fn test_plan_malformed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("I think you should click")))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let err = oracle.plan_next_action(plan_request()).await.unwrap_err();
    assert!(matches!(err, OracleError::Malformed(_)));
}

#[tokio::test]
async fn test_api_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let err = oracle.plan_next_action(plan_request()).await.unwrap_err();
    assert!(matches!(
        err,
        OracleError::Api { status: 429, ref message } if message == "rate limited"
    ));
}

#[tokio::test]
async fn test_network_error() {
    let oracle = OpenAIOracle::new(&OracleConfig::default()).with_base_url("http://127.0.0.1:1");
    let err = oracle.plan_next_action(plan_request()).await.unwrap_err();
    assert!(matches!(err, OracleError::Network(_)));
}

#[tokio::test]
async fn test_examine_text_clamps_confidence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"relevant":true,"summary":"clicked buy","key_findings":["cart"],"confidence":1.7}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let exam = oracle
        .examine_text(&ContextSnippet::whole("act:click:#buy"), "what happened?", "buy")
        .await
        .unwrap();
    assert!(exam.relevant);
    assert_eq!(exam.summary, "clicked buy");
    assert_eq!(exam.confidence, 1.0);
}

#[tokio::test]
async fn test_examine_text_failure_maps_to_examiner_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let err = oracle
        .examine_text(&ContextSnippet::whole("x"), "q", "g")
        .await
        .unwrap_err();
    assert!(matches!(err, ExaminerError::Backend(_)));
}

#[tokio::test]
async fn test_examine_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"relevant":true,"description":"search box","elements":["input#q"],"confidence":0.9}"#,
        )))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let exam = oracle
        .examine_image(&VisualSnippet::whole(Screenshot::from_base64("AAAA")), "search?", "search")
        .await
        .unwrap();
    assert_eq!(exam.elements, vec!["input#q"]);
    assert!((exam.score() - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_analyze_observation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o", "max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r##"{"description":"login form","relevant_elements":["#user"],"page_type":"form"}"##,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let analysis = oracle
        .analyze_observation("log in", &Screenshot::from_base64("AAAA"), "https://a.test/login")
        .await
        .unwrap();
    assert_eq!(analysis.page_type.as_deref(), Some("form"));
}

#[tokio::test]
async fn test_summarize_empty_skips_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    assert_eq!(oracle.summarize(&[]).await.unwrap(), "No events to summarize.");
}

#[tokio::test]
async fn test_summarize_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            "  Opened the site and clicked next.\n",
        )))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let events = vec![Event::new(EventKind::Act, "click:#next")];
    assert_eq!(
        oracle.summarize(&events).await.unwrap(),
        "Opened the site and clicked next."
    );
}

#[tokio::test]
async fn test_decompose_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 800})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"should_decompose":true,"reasoning":"two sites","subtasks":["check site a","check site b"]}"#,
        )))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    let verdict = oracle.decompose_task("compare prices", "", 0, 3).await.unwrap();
    assert!(verdict.has_subtasks());
    assert_eq!(verdict.subtasks.len(), 2);
}

#[tokio::test]
async fn test_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"model": "text-embedding-3-small", "input": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.5, 0.25]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    assert_eq!(oracle.embed("hello").await.unwrap(), vec![0.5, 0.25]);
}

#[tokio::test]
async fn test_embed_without_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let oracle = oracle_for(&server).await;
    assert!(matches!(
        oracle.embed("hello").await.unwrap_err(),
        OracleError::EmptyResponse
    ));
}
