pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod search;
pub mod seed;

pub use connection::{connect_mongo, connect_with_settings, mongo_handle, DbPool, MongoHandle};
pub use repositories::{ConversationMemory, RepositoryError};
pub use search::{SearchHit, VectorSearch};
pub use seed::SeedReport;
