use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::{run_pending, MIGRATOR};
    use crate::connect_with_settings;

    const MANAGED_TABLES: &[&str] = &["conversation_thread", "conversation_message"];

    #[test]
    fn migrator_embeds_conversation_and_vector_migrations() {
        let descriptions =
            MIGRATOR.iter().map(|migration| migration.description.to_string()).collect::<Vec<_>>();

        assert_eq!(descriptions, vec!["conversation threads", "vector extension"]);
    }

    #[tokio::test]
    async fn migrations_create_conversation_tables() {
        let Ok(url) = std::env::var("HRBOT_TEST_POSTGRES_URL") else {
            return;
        };
        let pool = connect_with_settings(&url, 1, 10).await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");

        for table in MANAGED_TABLES {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("query information_schema");
            assert!(exists, "table {table} should exist after migrations");
        }

        pool.close().await;
    }
}
