//! Ingest a PDF and chat about it against a mocked Ollama

mod common;

use pdf_rag::{ChatRequest, ChatService, Error};

#[tokio::test]
async fn test_ingest_then_ask() {
    let ollama = common::mock_ollama().await;
    let dir = tempfile::tempdir().unwrap();
    let chat = ChatService::from_config(common::config(&ollama.uri(), dir.path())).unwrap();

    let outcome = chat
        .rag()
        .process_pdf("policy.pdf", common::policy_pdf())
        .await
        .unwrap();
    assert_eq!(outcome.document.total_pages, 3);
    assert_eq!(outcome.chunks, 3);
    assert!(dir.path().join("chroma_db/pdf_documents.json").exists());

    let response = chat
        .ask(&ChatRequest::new("How long does shipping take?"))
        .await
        .unwrap();

    assert_eq!(response.answer, common::ANSWER);
    assert_eq!(response.chunks_retrieved, 3);
    assert_eq!(response.citations[0].filename, "policy.pdf");
    assert_eq!(response.citations[0].page_number, 2);
    assert!(response.citations[0]
        .snippet_highlighted
        .contains("<mark>Shipping</mark>"));

    let requests = common::generate_requests(&ollama).await;
    assert_eq!(requests.len(), 1);
    let body = &requests[0];
    assert_eq!(body["model"], "llama3");
    assert_eq!(body["stream"], false);
    assert_eq!(body["options"]["top_k"], 50);
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("Answer based on this context:\nShipping takes five business days"));
    assert!(prompt.ends_with("Question: How long does shipping take?\nAnswer:"));

    assert!(dir.path().join("chat_memory.json").exists());
    assert!(dir.path().join("chat_backup.json").exists());
}

#[tokio::test]
async fn test_memory_survives_restart() {
    let ollama = common::mock_ollama().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let chat = ChatService::from_config(common::config(&ollama.uri(), dir.path())).unwrap();
        chat.rag()
            .process_pdf("policy.pdf", common::policy_pdf())
            .await
            .unwrap();
        chat.ask(&ChatRequest::new("What about refunds?")).await.unwrap();
    }

    let chat = ChatService::from_config(common::config(&ollama.uri(), dir.path())).unwrap();
    assert_eq!(chat.history().messages.len(), 2);

    chat.ask(&ChatRequest::new("And the warranty?")).await.unwrap();
    let requests = common::generate_requests(&ollama).await;
    let prompt = requests.last().unwrap()["prompt"].as_str().unwrap().to_string();
    assert!(prompt.contains(&format!(
        "Chat history:\nHuman: What about refunds?\nAI: {}\n\n",
        common::ANSWER
    )));
}

#[tokio::test]
async fn test_ask_before_upload() {
    let ollama = common::mock_ollama().await;
    let dir = tempfile::tempdir().unwrap();
    let chat = ChatService::from_config(common::config(&ollama.uri(), dir.path())).unwrap();

    let err = chat.ask(&ChatRequest::new("anything?")).await.unwrap_err();
    assert!(matches!(err, Error::NoDocuments));
    assert!(common::generate_requests(&ollama).await.is_empty());
}

#[tokio::test]
async fn test_ollama_down_is_llm_error() {
    let ollama = common::mock_ollama().await;
    let dir = tempfile::tempdir().unwrap();
    let chat = ChatService::from_config(common::config(&ollama.uri(), dir.path())).unwrap();
    chat.rag()
        .process_pdf("policy.pdf", common::policy_pdf())
        .await
        .unwrap();

    // same collection, unreachable Ollama
    let offline = ChatService::from_config(common::config("http://127.0.0.1:9", dir.path())).unwrap();
    let err = offline.ask(&ChatRequest::new("refunds?")).await.unwrap_err();
    assert!(matches!(err, Error::Llm(_)));
    assert_eq!(offline.history().messages.len(), 0);
}
