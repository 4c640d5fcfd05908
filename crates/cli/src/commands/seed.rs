use std::fs;
use std::path::Path;

use hrbot_agent::OpenAiEmbedder;
use hrbot_core::config::AppConfig;
use hrbot_core::{BackingStore, EmployeeRecord};
use hrbot_db::seed::{seed_mongo, seed_postgres};
use hrbot_db::{connect_mongo, connect_with_settings, SeedReport};

use crate::commands::{current_thread_runtime, load_config, CommandResult};

type Failure = (&'static str, String, u8);

pub fn run_postgres(file: &Path) -> CommandResult {
    run(BackingStore::Postgres, file)
}

pub fn run_mongodb(file: &Path) -> CommandResult {
    run(BackingStore::MongoDb, file)
}

fn command_name(store: BackingStore) -> &'static str {
    match store {
        BackingStore::Postgres => "seed-postgres",
        BackingStore::MongoDb => "seed-mongodb",
    }
}

fn run(store: BackingStore, file: &Path) -> CommandResult {
    let command = command_name(store);
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let employees = match read_employees(file) {
        Ok(employees) => employees,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure(command, error_class, message, exit_code)
        }
    };
    let embedder = match OpenAiEmbedder::new(&config.embeddings) {
        Ok(embedder) => embedder,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to build embeddings client: {error}"),
                3,
            )
        }
    };
    let runtime = match current_thread_runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        match store {
            BackingStore::Postgres => seed_into_postgres(&config, &embedder, &employees).await,
            BackingStore::MongoDb => seed_into_mongodb(&config, &embedder, &employees).await,
        }
    });

    match result {
        Ok(report) => CommandResult::success(
            command,
            format!("seeded {} employee records into {}", report.records_seeded, report.target),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

async fn seed_into_postgres(
    config: &AppConfig,
    embedder: &OpenAiEmbedder,
    employees: &[EmployeeRecord],
) -> Result<SeedReport, Failure> {
    let pool = connect_with_settings(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    let outcome = seed_postgres(&pool, embedder, &config.postgres.employees_table, employees)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8));
    pool.close().await;
    outcome
}

async fn seed_into_mongodb(
    config: &AppConfig,
    embedder: &OpenAiEmbedder,
    employees: &[EmployeeRecord],
) -> Result<SeedReport, Failure> {
    let handle =
        connect_mongo(&config.mongodb.uri, &config.mongodb.database, config.mongodb.timeout_secs)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    let outcome = seed_mongo(&handle, embedder, &config.mongodb.employees_collection, employees)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8));
    handle.close().await;
    outcome
}

fn read_employees(file: &Path) -> Result<Vec<EmployeeRecord>, Failure> {
    let raw = fs::read_to_string(file).map_err(|error| {
        ("seed_input", format!("failed to read {}: {error}", file.display()), 6u8)
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        let message = format!("{} is not a list of employee records: {error}", file.display());
        ("seed_input", message, 6u8)
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::read_employees;

    #[test]
    fn empty_array_is_a_valid_seed_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("employees.json");
        fs::write(&path, "[]").expect("write");

        assert_eq!(read_employees(&path).expect("parse").len(), 0);
    }

    #[test]
    fn records_missing_required_fields_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("employees.json");
        fs::write(&path, r#"[{"employee_id":"E-1","first_name":"Ada"}]"#).expect("write");

        let (error_class, message, exit_code) = read_employees(&path).expect_err("should fail");
        assert_eq!(error_class, "seed_input");
        assert_eq!(exit_code, 6);
        assert!(message.contains("missing field"), "{message}");
    }
}
