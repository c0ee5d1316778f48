//! Tests for the Ollama clients against an in-process stand-in server.
#![cfg(feature = "ollama")]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use docqa_rag::{
    AnswerSynthesizer, EmbeddingProvider, OllamaConfig, OllamaEmbeddingProvider, OllamaGenerator,
    RagError, TextGenerator, collect_stream,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn generate(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Response {
    recorded.requests.lock().unwrap().push(body.clone());

    if body["model"] == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "model 'missing' not found"})))
            .into_response();
    }

    if body["stream"] == true {
        // Line boundaries deliberately fall in the middle of body chunks.
        let parts = [
            "{\"response\":\"The answer\",\"done\":false}\n{\"resp",
            "onse\":\" is \",\"done\":false}\n",
            "{\"response\":\"42.\",\"done\":false}\n{\"response\":\"\",\"done\":true}",
        ];
        let stream = futures::stream::iter(
            parts.into_iter().map(|p| Ok::<_, std::io::Error>(p.to_string())),
        );
        return Body::from_stream(stream).into_response();
    }

    Json(json!({"model": body["model"], "response": "  Summary text.  ", "done": true}))
        .into_response()
}

async fn embed(Json(body): Json<Value>) -> Json<Value> {
    let count = body["input"].as_array().map_or(0, Vec::len);
    let embeddings: Vec<Value> = (0..count).map(|_| json!([3.0, 4.0])).collect();
    Json(json!({"model": body["model"], "embeddings": embeddings}))
}

async fn spawn_server() -> (String, Recorded, tokio::task::JoinHandle<()>) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/generate", post(generate))
        .route("/api/embed", post(embed))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), recorded, handle)
}

#[tokio::test]
async fn generate_sends_options_and_reads_single_object() {
    let (base, recorded, handle) = spawn_server().await;
    let generator = OllamaGenerator::new(OllamaConfig::default().with_base_url(base));

    let text = generator.generate("Summarize this").await.unwrap();
    assert_eq!(text, "  Summary text.  ");

    let requests = recorded.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "gemma");
    assert_eq!(requests[0]["prompt"], "Summarize this");
    assert_eq!(requests[0]["stream"], false);
    assert!(requests[0]["options"]["temperature"].is_number());
    assert!(requests[0]["options"]["repeat_penalty"].is_number());

    handle.abort();
}

#[tokio::test]
async fn generate_stream_concatenates_fragments() {
    let (base, recorded, handle) = spawn_server().await;
    let generator = OllamaGenerator::new(OllamaConfig::default().with_base_url(base));

    let stream = generator.generate_stream("Question?").await.unwrap();
    let text = collect_stream(stream).await.unwrap();
    assert_eq!(text, "The answer is 42.");
    assert_eq!(recorded.requests.lock().unwrap()[0]["stream"], true);

    handle.abort();
}

#[tokio::test]
async fn server_error_becomes_synthesis_error() {
    let (base, _recorded, handle) = spawn_server().await;
    let generator =
        OllamaGenerator::new(OllamaConfig::default().with_base_url(base).with_model("missing"));

    let err = generator.generate("anything").await.unwrap_err();
    match err {
        RagError::SynthesisError(message) => {
            assert!(message.contains("404"), "{message}");
            assert!(message.contains("not found"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    handle.abort();
}

#[tokio::test]
async fn synthesizer_trims_answer() {
    let (base, _recorded, handle) = spawn_server().await;
    let generator = Arc::new(OllamaGenerator::new(OllamaConfig::default().with_base_url(base)));
    let synthesizer = AnswerSynthesizer::new(generator);

    let answer = synthesizer.answer("What?", &[], None).await.unwrap();
    assert_eq!(answer, "Summary text.");

    handle.abort();
}

#[tokio::test]
async fn embedding_provider_detects_dimension_and_normalizes() {
    let (base, _recorded, handle) = spawn_server().await;
    let provider =
        OllamaEmbeddingProvider::detect(OllamaConfig::default().with_base_url(base)).await.unwrap();
    assert_eq!(provider.dimensions(), 2);

    let vectors = provider.embed_batch(&["one", "two"]).await.unwrap();
    assert_eq!(vectors.len(), 2);
    for v in &vectors {
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    handle.abort();
}

#[tokio::test]
async fn embedding_provider_rejects_unexpected_dimension() {
    let (base, _recorded, handle) = spawn_server().await;
    let provider = OllamaEmbeddingProvider::new(OllamaConfig::default().with_base_url(base), 384);

    let err = provider.embed("text").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_embedding_error() {
    let provider =
        OllamaEmbeddingProvider::new(OllamaConfig::default().with_base_url("http://127.0.0.1:9"), 2);
    assert!(matches!(provider.embed("text").await, Err(RagError::EmbeddingError { .. })));
}
