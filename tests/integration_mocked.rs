/// Integration tests with mocked provider and notifier APIs
/// Exercises the provider client, orchestrator and sinks without hitting real services
use rust_loa_api::composer::{CompositionInput, SolutionComposer};
use rust_loa_api::models::{
    CompositeArtifact, ContentTask, ProviderId, ProviderRequest, ResultStatus, SectionStatus,
};
use rust_loa_api::notifier::{ArtifactSink, N8nWorkflowSink, NotionSink, TelegramSink};
use rust_loa_api::orchestrator::{PlanStep, ProviderOrchestrator, TaskPlan};
use rust_loa_api::providers::{ProviderClient, ProviderSettings};
use rust_loa_api::repository::ArtifactRepository;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a client pointing at a mock server
fn create_test_client(provider: ProviderId, base_url: String) -> ProviderClient {
    let model = match provider {
        ProviderId::OpenAi => "gpt-4-turbo",
        ProviderId::Gemini => "gemini-pro",
        ProviderId::DeepSeek => "deepseek-chat",
    };
    ProviderClient::new(ProviderSettings {
        provider,
        base_url,
        api_key: format!("test-{}", provider),
        model: model.to_string(),
    })
    .unwrap()
}

fn chat_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "model": "gpt-4-turbo-2024-04-09",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42}
    })
}

fn gemini_response(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts.iter().map(|t| serde_json::json!({"text": t})).collect();
    serde_json::json!({
        "candidates": [{"content": {"role": "model", "parts": parts}}],
        "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 16, "totalTokenCount": 24}
    })
}

const GEMINI_PATH: &str = "/models/gemini-pro:generateContent";
const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_openai_successful_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Bold and warm.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let result = client
        .call(&ProviderRequest::new(ProviderId::OpenAi, "Describe the voice"), TIMEOUT)
        .await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.content.as_deref(), Some("Bold and warm."));
    assert_eq!(result.model, "gpt-4-turbo-2024-04-09");
    assert_eq!(result.usage.unwrap().total_tokens, 42);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_gemini_joins_parts_and_sends_key_as_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(query_param("key", "test-gemini"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_response(&["Hola ", "mundo"])),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::Gemini, mock_server.uri());
    let result = client
        .call(&ProviderRequest::new(ProviderId::Gemini, "Translate"), TIMEOUT)
        .await;

    assert!(result.is_success());
    assert_eq!(result.content.as_deref(), Some("Hola mundo"));
    assert_eq!(result.model, "gemini-pro");
    assert_eq!(result.usage.unwrap().total_tokens, 24);
}

#[tokio::test]
async fn test_deepseek_uses_chat_completions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-deepseek"))
        .and(body_string_contains("deepseek-chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Automate invoicing first."}}]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::DeepSeek, mock_server.uri());
    let result = client
        .call(&ProviderRequest::new(ProviderId::DeepSeek, "Automation plan"), TIMEOUT)
        .await;

    assert!(result.is_success());
    assert_eq!(result.model, "deepseek-chat");
    assert!(result.usage.is_none());
}

#[tokio::test]
async fn test_provider_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let result = client
        .call(&ProviderRequest::new(ProviderId::OpenAi, "hi"), TIMEOUT)
        .await;

    assert_eq!(result.status, ResultStatus::Failure);
    let error = result.error.unwrap();
    assert!(error.contains("429"), "unexpected error: {}", error);
    assert!(error.contains("rate limited"));
    assert!(result.content.is_none());
}

#[tokio::test]
async fn test_provider_timeout_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let result = client
        .call(
            &ProviderRequest::new(ProviderId::OpenAi, "hi"),
            Duration::from_millis(200),
        )
        .await;

    assert_eq!(result.status, ResultStatus::Failure);
    assert!(result.error.unwrap().contains("timed out"));
    assert!(result.latency_ms < 2000);
}

#[tokio::test]
async fn test_malformed_json_content_keeps_raw_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_response("Sure! Here is your voice.")),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let request = ProviderRequest::new(ProviderId::OpenAi, "Voice as JSON").json();
    let result = client.call(&request, TIMEOUT).await;

    assert_eq!(result.status, ResultStatus::Failure);
    assert!(result.error.as_deref().unwrap().contains("not valid JSON"));
    assert_eq!(
        result.raw_response.as_deref(),
        Some("Sure! Here is your voice.")
    );

    // Raw payloads stay internal
    let serialized = serde_json::to_value(&result).unwrap();
    assert!(serialized.get("raw_response").is_none());
}

#[tokio::test]
async fn test_fenced_json_content_is_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            "```json\n{\"personality\": [\"bold\", \"warm\"]}\n```",
        )))
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let request = ProviderRequest::new(ProviderId::OpenAi, "Voice as JSON").json();
    let result = client.call(&request, TIMEOUT).await;

    assert!(result.is_success());
    assert_eq!(
        result.structured.unwrap()["personality"][1],
        serde_json::json!("warm")
    );
}

#[tokio::test]
async fn test_one_line_fenced_json_is_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            "```json{\"tone\": \"bold\"}```",
        )))
        .mount(&mock_server)
        .await;

    let client = create_test_client(ProviderId::OpenAi, mock_server.uri());
    let request = ProviderRequest::new(ProviderId::OpenAi, "Voice as JSON").json();
    let result = client.call(&request, TIMEOUT).await;

    assert!(result.is_success());
    assert_eq!(result.structured.unwrap()["tone"], "bold");
}

#[tokio::test]
async fn test_fan_out_reports_every_provider() {
    let openai = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(&["ok"])))
        .mount(&gemini)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![
            create_test_client(ProviderId::OpenAi, openai.uri()),
            create_test_client(ProviderId::Gemini, gemini.uri()),
        ],
        TIMEOUT,
    );

    let results = orchestrator
        .fan_out(vec![
            ProviderRequest::new(ProviderId::OpenAi, "a"),
            ProviderRequest::new(ProviderId::Gemini, "b"),
            ProviderRequest::new(ProviderId::DeepSeek, "c"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[&ProviderId::OpenAi].status, ResultStatus::Failure);
    assert_eq!(results[&ProviderId::Gemini].status, ResultStatus::Success);
    assert_eq!(
        results[&ProviderId::DeepSeek].error.as_deref(),
        Some("provider deepseek not configured")
    );
}

#[tokio::test]
async fn test_slow_provider_does_not_block_the_others() {
    let openai = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(&["fast"])))
        .mount(&gemini)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![
            create_test_client(ProviderId::OpenAi, openai.uri()),
            create_test_client(ProviderId::Gemini, gemini.uri()),
        ],
        Duration::from_millis(300),
    );

    let started = std::time::Instant::now();
    let results = orchestrator
        .fan_out(vec![
            ProviderRequest::new(ProviderId::OpenAi, "a"),
            ProviderRequest::new(ProviderId::Gemini, "b"),
        ])
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(results[&ProviderId::OpenAi].error.as_deref().unwrap().contains("timed out"));
    assert_eq!(results[&ProviderId::Gemini].content.as_deref(), Some("fast"));
}

#[tokio::test]
async fn test_dependent_step_receives_upstream_output() {
    let openai = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("VOICE-CONTEXT-42")))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(body_string_contains("Context from openai:"))
        .and(body_string_contains("VOICE-CONTEXT-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(&["adapted"])))
        .expect(1)
        .mount(&gemini)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![
            create_test_client(ProviderId::OpenAi, openai.uri()),
            create_test_client(ProviderId::Gemini, gemini.uri()),
        ],
        TIMEOUT,
    );

    let plan = TaskPlan::new(
        ContentTask::BrandVoice,
        vec![
            PlanStep::after(
                ProviderRequest::new(ProviderId::Gemini, "Adapt the voice"),
                ProviderId::OpenAi,
            ),
            PlanStep::independent(ProviderRequest::new(ProviderId::OpenAi, "Create the voice")),
        ],
    )
    .unwrap();

    let results = orchestrator.execute(&plan).await;

    assert!(results[&ProviderId::OpenAi].is_success());
    assert_eq!(results[&ProviderId::Gemini].content.as_deref(), Some("adapted"));
}

#[tokio::test]
async fn test_dependent_step_runs_without_context_after_upstream_failure() {
    let openai = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(&["standalone"])))
        .mount(&gemini)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![
            create_test_client(ProviderId::OpenAi, openai.uri()),
            create_test_client(ProviderId::Gemini, gemini.uri()),
        ],
        TIMEOUT,
    );
    let plan = TaskPlan::new(
        ContentTask::BrandVoice,
        vec![
            PlanStep::independent(ProviderRequest::new(ProviderId::OpenAi, "Create the voice")),
            PlanStep::after(
                ProviderRequest::new(ProviderId::Gemini, "Adapt the voice"),
                ProviderId::OpenAi,
            ),
        ],
    )
    .unwrap();

    let results = orchestrator.execute(&plan).await;

    assert_eq!(results[&ProviderId::OpenAi].status, ResultStatus::Failure);
    assert!(results[&ProviderId::Gemini].is_success());

    let received = gemini.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(!body.contains("Context from"));
}

#[tokio::test]
async fn test_circuit_opens_after_consecutive_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(5)
        .mount(&mock_server)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![create_test_client(ProviderId::OpenAi, mock_server.uri())],
        TIMEOUT,
    );

    for _ in 0..5 {
        let results = orchestrator
            .fan_out(vec![ProviderRequest::new(ProviderId::OpenAi, "hi")])
            .await;
        assert!(results[&ProviderId::OpenAi].error.as_deref().unwrap().contains("500"));
    }

    for _ in 0..2 {
        let results = orchestrator
            .fan_out(vec![ProviderRequest::new(ProviderId::OpenAi, "hi")])
            .await;
        let result = &results[&ProviderId::OpenAi];
        assert_eq!(result.status, ResultStatus::Failure);
        assert!(result.error.as_deref().unwrap().contains("circuit open"));
    }
}

#[tokio::test]
async fn test_malformed_content_does_not_open_circuit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("not json")))
        .expect(6)
        .mount(&mock_server)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![create_test_client(ProviderId::OpenAi, mock_server.uri())],
        TIMEOUT,
    );

    for _ in 0..6 {
        let results = orchestrator
            .fan_out(vec![ProviderRequest::new(ProviderId::OpenAi, "hi").json()])
            .await;
        let error = results[&ProviderId::OpenAi].error.clone().unwrap();
        assert!(!error.contains("circuit open"), "unexpected error: {}", error);
    }
}

#[tokio::test]
async fn test_execute_all_builds_sections_per_task() {
    let openai = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("done")))
        .mount(&openai)
        .await;

    let orchestrator = ProviderOrchestrator::new(
        vec![create_test_client(ProviderId::OpenAi, openai.uri())],
        TIMEOUT,
    );
    let plans = vec![
        TaskPlan::new(
            ContentTask::VisualDesign,
            vec![
                PlanStep::independent(ProviderRequest::new(ProviderId::OpenAi, "palette")),
                PlanStep::independent(ProviderRequest::new(ProviderId::Gemini, "moodboard")),
            ],
        )
        .unwrap(),
        TaskPlan::new(
            ContentTask::BusinessAutomation,
            vec![PlanStep::independent(ProviderRequest::new(
                ProviderId::OpenAi,
                "workflows",
            ))],
        )
        .unwrap(),
    ];

    let sections = orchestrator.execute_all(&plans).await;

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].task, ContentTask::VisualDesign);
    assert_eq!(sections[0].status, SectionStatus::Partial);
    assert_eq!(sections[1].task, ContentTask::BusinessAutomation);
    assert_eq!(sections[1].status, SectionStatus::Complete);
}

fn sample_artifact() -> CompositeArtifact {
    let composer = SolutionComposer::new(ArtifactRepository::default());
    composer
        .build(
            &CompositionInput {
                subject: "Shopline".to_string(),
                lead: None,
                assessment: None,
                sections: vec![],
            },
            chrono::Utc::now(),
        )
        .unwrap()
}

#[tokio::test]
async fn test_n8n_sink_posts_artifact_with_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/loa"))
        .and(header("authorization", "Bearer n8n-token"))
        .and(body_string_contains("art_00112233aabbccdd"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = N8nWorkflowSink::new(
        format!("{}/webhook/loa", mock_server.uri()),
        Some("n8n-token".to_string()),
    )
    .unwrap();

    sink.deliver(&sample_artifact().flatten()).await.unwrap();
}

#[tokio::test]
async fn test_notion_sink_creates_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_string_contains("db-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "page"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = NotionSink::new(mock_server.uri(), "notion-secret".to_string(), "db-123".to_string())
        .unwrap();

    sink.deliver(&sample_artifact().flatten()).await.unwrap();
}

#[tokio::test]
async fn test_telegram_sink_error_hides_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/botsecret-bot-token/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
        .mount(&mock_server)
        .await;

    let sink = TelegramSink::new(
        mock_server.uri(),
        "secret-bot-token".to_string(),
        "-100".to_string(),
    )
    .unwrap();

    let err = sink.deliver(&sample_artifact().flatten()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("chat not found"));
    assert!(!message.contains("secret-bot-token"));
}
