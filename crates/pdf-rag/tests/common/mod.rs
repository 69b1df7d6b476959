//! Shared fixtures: generated PDFs and a mocked Ollama server

#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_rag::RagConfig;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ANSWER: &str = "Refund requests are accepted within thirty days.";

/// A PDF with one line of Courier text per page
pub fn pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn policy_pdf() -> Vec<u8> {
    pdf(&[
        "Refund requests are accepted within thirty days",
        "Shipping takes five business days",
        "The warranty lasts two years",
    ])
}

/// Hashes words into buckets so shared vocabulary means high similarity
struct BagOfWords;

impl Respond for BagOfWords {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let prompt = body["prompt"].as_str().unwrap_or_default();

        let mut v = vec![0.0f32; 2048];
        for word in prompt
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % 2048] += 1.0;
        }
        // never return a zero vector
        v[0] += 0.01;

        ResponseTemplate::new(200).set_body_json(json!({ "embedding": v }))
    }
}

/// Ollama with /api/tags, /api/embeddings and /api/generate
pub async fn mock_ollama() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:latest"}, {"name": "nomic-embed-text:latest"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(BagOfWords)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": ANSWER,
            "done": true
        })))
        .mount(&server)
        .await;

    server
}

/// Configuration pointing every file into `dir` and the LLM at `ollama_url`
pub fn config(ollama_url: &str, dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.llm.base_url = ollama_url.to_string();
    config.llm.max_retries = 0;
    config.llm.timeout_secs = 5;
    config.storage.data_dir = dir.join("data");
    config.storage.vector_dir = dir.join("chroma_db");
    config.storage.memory_path = dir.join("chat_memory.json");
    config.storage.transcript_path = dir.join("chat_backup.json");
    config
}

/// Bodies of every /api/generate request the mock received
pub async fn generate_requests(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/api/generate")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}
