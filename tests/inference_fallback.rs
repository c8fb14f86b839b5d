//! HTTP-mocked integration test for the OpenAI-compatible provider's
//! chat-endpoint fallback path (spec.md §8 scenario 4): a 404 from
//! `/v1/chat/completions` must trigger exactly one follow-up call to
//! `/v1/completions`, with the final content coming from that fallback.

use moneyclaw::inference::{ChatOptions, ProviderClient};
use moneyclaw::inference::providers::OpenAiProvider;
use moneyclaw::types::{ChatMessage, ChatRole, ParamStyle};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn chat_endpoint_404_falls_back_to_completions_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({
                    "error": "/v1/chat/completions endpoint not supported"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"text": "legacy ok"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&server.uri(), "test-key");
    let messages = vec![ChatMessage::text(ChatRole::User, "hello")];
    let options = ChatOptions {
        model: "gpt-4o".into(),
        max_tokens: 64,
        param_style: ParamStyle::MaxTokens,
        timeout_secs: 10,
    };

    let result = provider.chat(&messages, &[], &options).await.unwrap();
    assert_eq!(result.content.as_deref(), Some("legacy ok"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
