use std::sync::Arc;

use async_trait::async_trait;
use sqlrag::{
    ChatClient, DdlSchemaParser, DeleteSchemaUseCase, DomainError, Embedding, EmbeddingConfig,
    EmbeddingService, GenerateSqlUseCase, InMemorySchemaRepository, InMemoryVectorRepository,
    IngestSchemaUseCase, ListSchemasUseCase, MockChatClient, MockEmbedding,
    RetrieveFragmentsUseCase, SchemaFormat, SchemaFragment, SchemaLocks, SchemaRepository,
    StalePolicy, VectorRepository,
};

const ORDERS_DDL: &str = "CREATE TABLE orders (id INT, customer_id INT, total DECIMAL(10, 2));\n\
                          CREATE TABLE customers (id INT, name TEXT, email TEXT);";

struct Harness {
    schema_repo: Arc<InMemorySchemaRepository>,
    vector_repo: Arc<InMemoryVectorRepository>,
    parser: Arc<DdlSchemaParser>,
    locks: Arc<SchemaLocks>,
    chat: Arc<MockChatClient>,
}

impl Harness {
    fn new() -> Self {
        Self {
            schema_repo: Arc::new(InMemorySchemaRepository::new()),
            vector_repo: Arc::new(InMemoryVectorRepository::new()),
            parser: Arc::new(DdlSchemaParser::new()),
            locks: Arc::new(SchemaLocks::new()),
            chat: Arc::new(MockChatClient::new()),
        }
    }

    fn ingest_with(&self, embedding: Arc<dyn EmbeddingService>) -> IngestSchemaUseCase {
        IngestSchemaUseCase::new(
            self.schema_repo.clone(),
            self.vector_repo.clone(),
            self.parser.clone(),
            embedding,
            self.locks.clone(),
        )
    }

    fn ingest(&self) -> IngestSchemaUseCase {
        self.ingest_with(Arc::new(MockEmbedding::new()))
    }

    fn retrieve_with(&self, embedding: Arc<dyn EmbeddingService>) -> RetrieveFragmentsUseCase {
        RetrieveFragmentsUseCase::new(self.schema_repo.clone(), self.vector_repo.clone(), embedding)
    }

    fn retrieve(&self) -> RetrieveFragmentsUseCase {
        self.retrieve_with(Arc::new(MockEmbedding::new()))
    }

    fn generate(&self) -> GenerateSqlUseCase {
        GenerateSqlUseCase::new(Arc::new(self.retrieve()), self.chat.clone())
    }

    fn list(&self) -> ListSchemasUseCase {
        ListSchemasUseCase::new(self.schema_repo.clone(), self.parser.clone())
    }

    fn delete(&self) -> DeleteSchemaUseCase {
        DeleteSchemaUseCase::new(
            self.schema_repo.clone(),
            self.vector_repo.clone(),
            self.locks.clone(),
        )
    }
}

/// Reports the mock model name but refuses to embed fragments.
struct FailingEmbedding {
    config: EmbeddingConfig,
}

impl FailingEmbedding {
    fn new() -> Self {
        Self {
            config: EmbeddingConfig::default(),
        }
    }
}

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed_fragments(
        &self,
        _fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError> {
        Err(DomainError::provider_unavailable("embedding backend is down"))
    }

    async fn embed_query(&self, _query: &str) -> Result<Vec<f32>, DomainError> {
        Err(DomainError::provider_unavailable("embedding backend is down"))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[tokio::test]
async fn orders_question_ranks_orders_table_first() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let matches = h
        .retrieve()
        .execute("orders", "what is the total for an order?", 1)
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].fragment_id(), "orders:orders");
}

#[tokio::test]
async fn asking_an_unknown_schema_is_schema_not_found() {
    let h = Harness::new();

    let result = h.generate().execute("nonexistent", "how many rows?", 5).await;

    assert!(matches!(result, Err(DomainError::SchemaNotFound(_))));
}

#[tokio::test]
async fn empty_definition_is_a_parse_error_and_stores_nothing() {
    let h = Harness::new();

    let result = h.ingest().execute("empty", "", false).await;

    assert!(matches!(result, Err(DomainError::ParseError(_))));
    assert!(h.schema_repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_question_and_zero_k_are_invalid() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let empty = h.retrieve().execute("orders", "   ", 3).await;
    let zero = h.retrieve().execute("orders", "orders", 0).await;

    assert!(matches!(empty, Err(DomainError::InvalidInput(_))));
    assert!(matches!(zero, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn query_with_other_dimensionality_is_rejected() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    // Same model name, different vector length.
    let result = h
        .retrieve_with(Arc::new(MockEmbedding::with_dimensions(16)))
        .execute("orders", "order totals", 2)
        .await;

    assert!(matches!(
        result,
        Err(DomainError::DimensionMismatch {
            expected: 384,
            actual: 16
        })
    ));
}

#[tokio::test]
async fn search_without_ingestion_is_not_indexed() {
    let h = Harness::new();

    let result = h.vector_repo.search("orders", &[0.0; 384], 1).await;

    assert!(matches!(result, Err(DomainError::SchemaNotIndexed(_))));
}

#[tokio::test]
async fn reingesting_identical_ddl_keeps_results_and_skips_rebuild() {
    let h = Harness::new();
    let ingest = h.ingest();

    let first = ingest.execute("orders", ORDERS_DDL, false).await.unwrap();
    let before = h.retrieve().execute("orders", "customer email", 2).await.unwrap();

    let second = ingest.execute("orders", ORDERS_DDL, false).await.unwrap();
    let after = h.retrieve().execute("orders", "customer email", 2).await.unwrap();

    assert!(first.rebuilt());
    assert!(!second.rebuilt());
    assert_eq!(first.fragment_ids(), second.fragment_ids());

    let ids = |m: &[sqlrag::FragmentMatch]| {
        m.iter()
            .map(|x| (x.fragment_id().to_string(), x.score()))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&before[..]), ids(&after[..]));
}

#[tokio::test]
async fn forced_reingestion_rebuilds() {
    let h = Harness::new();
    let ingest = h.ingest();
    ingest.execute("orders", ORDERS_DDL, false).await.unwrap();
    let before = h.retrieve().execute("orders", "customer email", 2).await.unwrap();

    let outcome = ingest.execute("orders", ORDERS_DDL, true).await.unwrap();
    let after = h.retrieve().execute("orders", "customer email", 2).await.unwrap();

    assert!(outcome.rebuilt());
    assert_eq!(h.vector_repo.count("orders").await.unwrap(), 2);

    let scored = |m: &[sqlrag::FragmentMatch]| {
        m.iter()
            .map(|x| (x.fragment_id().to_string(), x.score()))
            .collect::<Vec<_>>()
    };
    assert_eq!(before.len(), 2);
    assert_eq!(scored(&before[..]), scored(&after[..]));
}

#[tokio::test]
async fn results_are_best_first() {
    let h = Harness::new();
    h.ingest()
        .execute("shop", include_str!("fixtures/shop.sql"), false)
        .await
        .unwrap();

    let matches = h
        .retrieve()
        .execute("shop", "customer name and email", 3)
        .await
        .unwrap();

    assert_eq!(matches.len(), 3);
    assert!(matches.windows(2).all(|w| w[0].score() >= w[1].score()));
    assert_eq!(matches[0].fragment_id(), "shop:customers");
}

#[tokio::test]
async fn k_larger_than_the_index_returns_everything() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let matches = h.retrieve().execute("orders", "orders", 50).await.unwrap();

    assert_eq!(matches.len(), 2);
}

#[tokio::test]
async fn model_change_is_rejected_by_default() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let retrieve = h.retrieve_with(Arc::new(MockEmbedding::new().with_model_name("mock-v2")));
    assert_eq!(retrieve.stale_policy(), StalePolicy::Reject);

    let result = retrieve.execute("orders", "order totals", 1).await;

    assert!(matches!(result, Err(DomainError::StaleIndex(_))));
}

#[tokio::test]
async fn model_change_reingests_when_configured() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let v2: Arc<dyn EmbeddingService> = Arc::new(MockEmbedding::new().with_model_name("mock-v2"));
    let retrieve = h
        .retrieve_with(v2.clone())
        .with_reingest(Arc::new(h.ingest_with(v2)));
    assert_eq!(retrieve.stale_policy(), StalePolicy::Reingest);

    let matches = retrieve
        .execute("orders", "what is the total for an order?", 1)
        .await
        .unwrap();

    assert_eq!(matches[0].fragment_id(), "orders:orders");
    let record = h.schema_repo.find_by_name("orders").await.unwrap().unwrap();
    assert!(record.is_fresh_for("mock-v2"));
}

#[tokio::test]
async fn failed_ingestion_keeps_previous_index() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let changed = "CREATE TABLE invoices (id INT, amount FLOAT);";
    let result = h
        .ingest_with(Arc::new(FailingEmbedding::new()))
        .execute("orders", changed, false)
        .await;

    assert!(matches!(result, Err(DomainError::ProviderUnavailable(_))));

    let previous = h.vector_repo.search("orders", &[1.0; 384], 5).await.unwrap();
    let mut ids: Vec<&str> = previous.iter().map(|m| m.fragment_id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["orders:customers", "orders:orders"]);

    // The new definition was recorded but never indexed.
    assert!(!h.list().is_fresh("orders").await.unwrap());
    let stale = h.retrieve().execute("orders", "amount", 1).await;
    assert!(matches!(stale, Err(DomainError::StaleIndex(_))));
}

#[tokio::test]
async fn structured_schema_ingests_one_fragment_per_table() {
    let h = Harness::new();

    let outcome = h
        .ingest()
        .execute_auto(include_str!("fixtures/library.json"), false)
        .await
        .unwrap();

    assert_eq!(outcome.record().name(), "LibraryDB");
    assert_eq!(outcome.record().format(), SchemaFormat::Structured);
    assert_eq!(outcome.fragment_ids(), ["LibraryDB:books", "LibraryDB:loans"]);

    let info = h.list().info("LibraryDB").await.unwrap();
    assert_eq!(info.tables, vec!["books", "loans"]);
    assert_eq!(info.sql_language.as_deref(), Some("PostgreSQL"));

    let ddl = h.list().definition_as_ddl("LibraryDB").await.unwrap();
    assert!(ddl.contains("CREATE TABLE loans ("));
}

#[tokio::test]
async fn ddl_without_name_is_named_after_first_table() {
    let h = Harness::new();

    let outcome = h.ingest().execute_auto(ORDERS_DDL, false).await.unwrap();

    assert_eq!(outcome.record().name(), "Schema_orders");
}

#[tokio::test]
async fn generation_prompt_lists_ranked_fragments() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let generated = h
        .generate()
        .execute("orders", "what is the total for an order?", 2)
        .await
        .unwrap();

    assert_eq!(generated.fragment_ids(), ["orders:orders", "orders:customers"]);
    assert_eq!(generated.extracted_sql(), "SELECT 1;");
    assert_eq!(generated.response(), "```sql\nSELECT 1;\n```");

    let prompts = h.chat.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0], generated.prompt());
    assert!(prompts[0].contains("what is the total for an order?"));

    let orders_at = prompts[0].find("-- Fragment: orders:orders").unwrap();
    let customers_at = prompts[0].find("-- Fragment: orders:customers").unwrap();
    assert!(orders_at < customers_at);
}

#[tokio::test]
async fn streamed_generation_matches_the_buffered_result() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let mut chunks = Vec::new();
    let streamed = h
        .generate()
        .execute_streaming("orders", "what is the total for an order?", 2, |chunk| {
            chunks.push(chunk.to_string());
            Ok(())
        })
        .await
        .unwrap();
    let buffered = h
        .generate()
        .execute("orders", "what is the total for an order?", 2)
        .await
        .unwrap();

    assert_eq!(chunks, vec!["```sql\n", "SELECT 1;\n", "```"]);
    assert_eq!(chunks.concat(), streamed.response());
    assert_eq!(streamed.response(), buffered.response());
    assert_eq!(streamed.fragment_ids(), buffered.fragment_ids());
    assert_eq!(streamed.extracted_sql(), "SELECT 1;");
    assert_eq!(streamed.prompt(), buffered.prompt());
}

#[tokio::test]
async fn chunk_handler_errors_stop_streaming() {
    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let mut seen = 0;
    let result = h
        .generate()
        .execute_streaming("orders", "order totals", 1, |_| {
            seen += 1;
            Err(DomainError::internal("output closed"))
        })
        .await;

    assert!(matches!(result, Err(DomainError::Internal(_))));
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn chat_failures_propagate() {
    struct DownChat;

    #[async_trait]
    impl ChatClient for DownChat {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, DomainError> {
            Err(DomainError::provider_unavailable("connection refused"))
        }

        fn model_name(&self) -> &str {
            "down"
        }
    }

    let h = Harness::new();
    h.ingest().execute("orders", ORDERS_DDL, false).await.unwrap();

    let generate = GenerateSqlUseCase::new(Arc::new(h.retrieve()), Arc::new(DownChat));

    let result = generate.execute("orders", "order totals", 1).await;
    assert!(matches!(result, Err(DomainError::ProviderUnavailable(_))));

    let streamed = generate
        .execute_streaming("orders", "order totals", 1, |_| Ok(()))
        .await;
    assert!(matches!(streamed, Err(DomainError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn list_is_sorted_and_delete_removes_everything() {
    let h = Harness::new();
    h.ingest().execute("zoo", ORDERS_DDL, false).await.unwrap();
    h.ingest().execute("alpha", ORDERS_DDL, false).await.unwrap();

    let names: Vec<String> = h
        .list()
        .execute()
        .await
        .unwrap()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "zoo"]);

    let removed = h.delete().execute("zoo").await.unwrap();

    assert_eq!(removed, 2);
    assert!(h.list().get("zoo").await.unwrap().is_none());
    assert!(!h.vector_repo.is_indexed("zoo").await.unwrap());
    assert!(!h.list().is_fresh("zoo").await.unwrap());
    assert!(matches!(
        h.delete().execute("zoo").await,
        Err(DomainError::SchemaNotFound(_))
    ));
}
