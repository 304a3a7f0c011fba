//! 관리형 인덱스 통합 테스트 (컨트롤러와 데이터 플레인 모두 wiremock)

use std::collections::HashMap;

use persona_rag::config::Settings;
use persona_rag::embedding::{EmbeddingProvider, HashedEmbedding};
use persona_rag::knowledge::{
    open_index, Chunk, ChunkMetadata, Document, IndexEntry, IndexMode, ManagedIndexClient,
    VectorIndex,
};
use persona_rag::Error;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIM: usize = 64;

fn description(server: &MockServer, dimension: usize, metric: &str) -> serde_json::Value {
    serde_json::json!({
        "database": {"name": "persona", "dimension": dimension, "metric": metric, "pods": 1},
        "status": {"ready": true, "host": server.uri(), "state": "Ready"}
    })
}

fn entry(text: &str, vector: Vec<f32>) -> IndexEntry {
    let doc = Document::new("resume.txt", text).with_title(Some("resume.txt".to_string()));
    let chunk = Chunk {
        text: text.to_string(),
        metadata: ChunkMetadata {
            document: doc.metadata,
            chunk_index: 0,
        },
    };
    IndexEntry::from_chunk(chunk, vector)
}

#[tokio::test]
async fn test_create_connect_upsert_query() {
    let server = MockServer::start().await;

    // 컨트롤 플레인
    Mock::given(method("GET"))
        .and(path("/databases"))
        .and(header("api-key", "pc-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/databases"))
        .and(body_json(serde_json::json!({"name": "persona", "dimension": DIM, "metric": "cosine"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/databases/persona"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, DIM, "cosine")))
        .mount(&server)
        .await;

    // 데이터 플레인
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("api-key", "pc-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"upsertedCount": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "matches": [
                {"id": "b", "score": 0.41, "metadata": {
                    "text": "Alice enjoys hiking.", "source": "bio.md", "fingerprint": "f2", "chunk_index": 0.0
                }},
                {"id": "a", "score": 0.93, "metadata": {
                    "text": "Alice is a software engineer.", "source": "resume.pdf",
                    "fingerprint": "f1", "page": 2.0, "chunk_index": 1.0
                }}
            ],
            "namespace": ""
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "dimension": DIM, "totalVectorCount": 2, "namespaces": {"": {"vectorCount": 2}}
        })))
        .mount(&server)
        .await;

    let client = ManagedIndexClient::with_controller_url("pc-key".into(), server.uri()).unwrap();
    assert!(client.create_if_absent("persona", DIM, "cosine").await.unwrap());

    let mut index = client.connect("persona").await.unwrap();
    assert_eq!(index.dimension(), DIM);
    assert_eq!(index.name(), "managed");
    assert_eq!(index.index_name(), "persona");

    let embedder = HashedEmbedding::new(DIM);
    let entries = vec![
        entry("Alice is a software engineer.", embedder.embed("Alice is a software engineer.").await.unwrap()),
        entry("Alice enjoys hiking.", embedder.embed("Alice enjoys hiking.").await.unwrap()),
    ];
    assert_eq!(index.upsert(entries).await.unwrap(), 2);

    // 업서트 요청의 메타데이터는 평탄한 JSON + text
    let requests = server.received_requests().await.unwrap();
    let upsert = requests
        .iter()
        .find(|r| r.url.path() == "/vectors/upsert")
        .unwrap();
    let body: serde_json::Value = upsert.body_json().unwrap();
    let vector = &body["vectors"][0];
    assert_eq!(vector["values"].as_array().unwrap().len(), DIM);
    assert_eq!(vector["metadata"]["text"], "Alice is a software engineer.");
    assert_eq!(vector["metadata"]["source"], "resume.txt");
    assert_eq!(vector["metadata"]["chunk_index"], 0);
    assert!(vector["metadata"].get("page").is_none());

    let query = embedder.embed("software").await.unwrap();
    let hits = index.similarity_search(&query, 4).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "Alice is a software engineer.");
    assert_eq!(hits[0].metadata.document.page, Some(2));
    assert_eq!(hits[0].metadata.chunk_index, 1);
    assert!(hits[0].score > hits[1].score);

    assert_eq!(index.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_existing_index_is_not_recreated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["persona"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/databases"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = ManagedIndexClient::with_controller_url("pc-key".into(), server.uri()).unwrap();
    assert!(!client.create_if_absent("persona", DIM, "cosine").await.unwrap());
}

#[tokio::test]
async fn test_contains_document_fetches_first_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/persona"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, DIM, "cosine")))
        .mount(&server)
        .await;

    let known = entry("Alice is a software engineer.", vec![0.0; DIM]);
    let mut vectors = serde_json::Map::new();
    vectors.insert(
        known.id.clone(),
        serde_json::json!({"id": known.id, "values": []}),
    );
    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("ids", known.id.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"vectors": vectors})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"vectors": {}})))
        .mount(&server)
        .await;

    let client = ManagedIndexClient::with_controller_url("pc-key".into(), server.uri()).unwrap();
    let index = client.connect("persona").await.unwrap();

    let fingerprint = &known.metadata.document.fingerprint;
    assert!(index.contains_document(fingerprint).await.unwrap());
    assert!(!index.contains_document("unknown").await.unwrap());
}

#[tokio::test]
async fn test_non_cosine_metric_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/persona"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, DIM, "euclidean")))
        .mount(&server)
        .await;

    let client = ManagedIndexClient::with_controller_url("pc-key".into(), server.uri()).unwrap();
    let err = client.connect("persona").await.unwrap_err();
    assert!(matches!(err, Error::VectorIndex(ref m) if m.contains("euclidean")));
}

#[tokio::test]
async fn test_open_index_dimension_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/persona"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 1536, "cosine")))
        .mount(&server)
        .await;

    let vars: HashMap<&str, String> = HashMap::from([
        ("EMBEDDINGS_BACKEND", "hashed".to_string()),
        ("EMBEDDING_DIMENSION", DIM.to_string()),
        ("CHAT_BACKEND", "openai".to_string()),
        ("OPENAI_API_KEY", "test-key".to_string()),
        ("INDEX_BACKEND", "managed".to_string()),
        ("INDEX_NAME", "persona".to_string()),
        ("PINECONE_API_KEY", "pc-key".to_string()),
        ("PINECONE_ENVIRONMENT", "us-west1-gcp".to_string()),
        ("PINECONE_CONTROLLER_URL", server.uri()),
    ]);
    let settings = Settings::from_lookup(|key| vars.get(key).cloned()).unwrap();
    let embedder = HashedEmbedding::new(DIM);

    let result = open_index(&settings, &embedder, IndexMode::Query).await;
    assert!(matches!(
        result,
        Err(Error::DimensionMismatch {
            expected: 1536,
            actual: 64
        })
    ));
}
