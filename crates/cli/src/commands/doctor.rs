use hrbot_core::config::{AppConfig, LoadOptions};
use hrbot_db::{connect_mongo, connect_with_settings};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code is 0 only when every check passes.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(check_postgres(&runtime, &config));
                    checks.push(check_mongodb(&runtime, &config));
                }
                Err(error) => {
                    let reason = format!("the async runtime failed to start: {error}");
                    checks.push(DoctorCheck::skipped("postgres_connectivity", &reason));
                    checks.push(DoctorCheck::skipped("mongodb_connectivity", &reason));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("postgres_connectivity", reason));
            checks.push(DoctorCheck::skipped("mongodb_connectivity", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_postgres(runtime: &Runtime, config: &AppConfig) -> DoctorCheck {
    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.postgres.url,
            config.postgres.max_connections,
            config.postgres.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to postgres: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "postgres_connectivity",
            status: CheckStatus::Pass,
            details: "connected to postgres".to_string(),
        },
        Err(error) => {
            DoctorCheck { name: "postgres_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_mongodb(runtime: &Runtime, config: &AppConfig) -> DoctorCheck {
    let result = runtime.block_on(async {
        let handle =
            connect_mongo(&config.mongodb.uri, &config.mongodb.database, config.mongodb.timeout_secs)
                .await
                .map_err(|error| format!("failed to reach mongodb: {error}"))?;

        handle.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "mongodb_connectivity",
            status: CheckStatus::Pass,
            details: format!("pinged database `{}`", config.mongodb.database),
        },
        Err(error) => {
            DoctorCheck { name: "mongodb_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
