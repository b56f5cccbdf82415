use std::time::Duration;

use citecrawl::embedder::huggingface::HuggingFaceEmbedder;
use citecrawl::{EmbeddingProvider, EmbeddingStatus};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embedder(server: &MockServer, timeout: Duration) -> HuggingFaceEmbedder {
    HuggingFaceEmbedder::new(
        Some("hf-test-key".to_string()),
        format!("{}/models/minilm", server.uri()),
        3,
        timeout,
    )
    .expect("embedder")
}

#[tokio::test]
async fn sends_wait_for_model_request_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/minilm"))
        .and(header("authorization", "Bearer hf-test-key"))
        .and(body_json(json!({
            "inputs": "graph neural networks",
            "options": { "wait_for_model": true }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.25, -0.5, 1.0])))
        .expect(1)
        .mount(&server)
        .await;

    let embedding = embedder(&server, Duration::from_secs(5))
        .embed("graph neural networks")
        .await;

    assert_eq!(embedding.status, EmbeddingStatus::Ok);
    assert_eq!(embedding.values, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn nested_response_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.1, 0.2, 0.3]])))
        .mount(&server)
        .await;

    let embedding = embedder(&server, Duration::from_secs(5)).embed("x").await;
    assert!(!embedding.is_degraded());
    assert_eq!(embedding.values, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn server_error_degrades_to_zero_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let embedding = embedder(&server, Duration::from_secs(5)).embed("x").await;
    assert_eq!(embedding.values, vec![0.0; 3]);
    match embedding.status {
        EmbeddingStatus::Degraded { reason } => assert!(reason.contains("503"), "{reason}"),
        EmbeddingStatus::Ok => panic!("expected degraded embedding"),
    }
}

#[tokio::test]
async fn slow_backend_times_out_to_zero_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([0.1, 0.2, 0.3]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let embedding = embedder(&server, Duration::from_millis(200))
        .embed("x")
        .await;
    assert!(embedding.is_degraded());
    assert_eq!(embedding.values.len(), 3);
}

#[tokio::test]
async fn wrong_dimension_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.1, 0.2])))
        .mount(&server)
        .await;

    let embedding = embedder(&server, Duration::from_secs(5)).embed("x").await;
    assert!(embedding.is_degraded());
    assert_eq!(embedding.values, vec![0.0; 3]);
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "inputs": "first", "options": { "wait_for_model": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1.0, 0.0, 0.0])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "inputs": "second", "options": { "wait_for_model": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.0, 1.0, 0.0])))
        .mount(&server)
        .await;

    let embeddings = embedder(&server, Duration::from_secs(5))
        .embed_batch(&["first", "second"])
        .await;
    assert_eq!(embeddings[0].values, vec![1.0, 0.0, 0.0]);
    assert_eq!(embeddings[1].values, vec![0.0, 1.0, 0.0]);
}
