use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect(database_url)
        .await
}

/// Process-wide MongoDB client plus the database the agent works in.
///
/// The driver pools connections internally, so clones share one pool.
#[derive(Clone, Debug)]
pub struct MongoHandle {
    client: Client,
    database: Database,
}

impl MongoHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.database.run_command(doc! { "ping": 1 }).await.map(|_| ())
    }

    pub async fn close(self) {
        self.client.shutdown().await;
    }
}

/// Builds the client without touching the server; the driver connects lazily.
pub async fn mongo_handle(
    uri: &str,
    database: &str,
    timeout_secs: u64,
) -> Result<MongoHandle, mongodb::error::Error> {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some("hrbot".to_string());
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);

    let client = Client::with_options(options)?;
    Ok(MongoHandle { database: client.database(database), client })
}

pub async fn connect_mongo(
    uri: &str,
    database: &str,
    timeout_secs: u64,
) -> Result<MongoHandle, mongodb::error::Error> {
    let handle = mongo_handle(uri, database, timeout_secs).await?;
    handle.ping().await?;
    Ok(handle)
}
