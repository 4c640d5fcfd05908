use std::sync::Arc;

use hrbot_agent::{
    AgentRouter, AgentRuntime, AgentSettings, AnthropicClient, EmployeeLookupTool, LlmClient,
    LlmError, OpenAiEmbedder, ToolRegistry,
};
use hrbot_core::config::{AppConfig, ConfigError, LoadOptions};
use hrbot_core::{BackingStore, Embedder, EmbeddingError};
use hrbot_db::repositories::{MongoConversationMemory, SqlConversationMemory};
use hrbot_db::search::{AtlasVectorSearch, PgVectorSearch};
use hrbot_db::{connect_mongo, connect_with_settings, migrations, DbPool, MongoHandle};
use thiserror::Error;
use tracing::info;

/// Process-wide resources, created once and released at shutdown.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub mongo: MongoHandle,
    pub router: Arc<AgentRouter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("mongodb connection failed: {0}")]
    MongoConnect(#[source] mongodb::error::Error),
    #[error("language model client could not be built: {0}")]
    LanguageModel(#[source] LlmError),
    #[error("embeddings client could not be built: {0}")]
    Embeddings(#[source] EmbeddingError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "postgres connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let mongo =
        connect_mongo(&config.mongodb.uri, &config.mongodb.database, config.mongodb.timeout_secs)
            .await
            .map_err(BootstrapError::MongoConnect)?;
    info!(
        event_name = "system.bootstrap.mongodb_connected",
        correlation_id = "bootstrap",
        database = %config.mongodb.database,
        "mongodb connection established"
    );

    let llm: Arc<dyn LlmClient> =
        Arc::new(AnthropicClient::new(&config.llm).map_err(BootstrapError::LanguageModel)?);
    let embedder: Arc<dyn Embedder> =
        Arc::new(OpenAiEmbedder::new(&config.embeddings).map_err(BootstrapError::Embeddings)?);

    let router = Arc::new(agent_router(&config, &db_pool, &mongo, llm, embedder));
    info!(
        event_name = "system.bootstrap.agents_ready",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        stores = ?router.configured_stores(),
        "agent router configured"
    );

    Ok(Application { config, db_pool, mongo, router })
}

/// Wires one agent per backing store, each searching and remembering in its own store.
pub fn agent_router(
    config: &AppConfig,
    db_pool: &DbPool,
    mongo: &MongoHandle,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn Embedder>,
) -> AgentRouter {
    let settings = AgentSettings::from(&config.agent);

    let mut postgres_tools = ToolRegistry::default();
    postgres_tools.register(EmployeeLookupTool::new(Arc::new(PgVectorSearch::new(
        db_pool.clone(),
        embedder.clone(),
        config.postgres.employees_table.clone(),
    ))));
    let postgres = AgentRuntime::new(
        BackingStore::Postgres,
        llm.clone(),
        postgres_tools,
        Arc::new(SqlConversationMemory::new(db_pool.clone())),
        settings,
    );

    let mut mongo_tools = ToolRegistry::default();
    mongo_tools.register(EmployeeLookupTool::new(Arc::new(AtlasVectorSearch::new(
        mongo,
        embedder,
        &config.mongodb.employees_collection,
        config.mongodb.vector_index.clone(),
    ))));
    let mongodb = AgentRuntime::new(
        BackingStore::MongoDb,
        llm,
        mongo_tools,
        Arc::new(MongoConversationMemory::new(mongo, &config.mongodb.threads_collection)),
        settings,
    );

    AgentRouter::new().with_runtime(postgres).with_runtime(mongodb)
}
