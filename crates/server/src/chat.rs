//! `POST /chat` - one conversational turn against the selected backing store.
//!
//! Mirrors the public contract of the original service:
//! - `200 {content, threadId, databaseType, timestamp}` on success
//! - `400 {statusCode, message: [..], error: "Bad Request"}` for malformed bodies
//! - `500 {statusCode, message: "Failed to process chat request", error}` otherwise

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use hrbot_agent::{AgentRouter, ThreadOrigin};
use hrbot_core::{BackingStore, InterfaceError, ThreadId};

const FAILURE_MESSAGE: &str = "Failed to process chat request";

#[derive(Clone)]
pub struct ChatState {
    pub router: Arc<AgentRouter>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub query: String,
    pub database_type: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatCommand {
    pub query: String,
    pub store: BackingStore,
    pub thread_id: Option<ThreadId>,
}

impl ChatRequestBody {
    /// Collects every violation, the way the original validation pipe reports them.
    pub fn validate(self) -> Result<ChatCommand, Vec<String>> {
        let mut violations = Vec::new();

        if self.query.trim().is_empty() {
            violations.push("query should not be empty".to_string());
        }
        let store = self.database_type.parse::<BackingStore>().map_err(|_| {
            violations.push(format!(
                "databaseType must be one of the following values: {}",
                BackingStore::ALL.map(|store| store.as_str()).join(", ")
            ));
        });
        let thread_id = match self.thread_id.as_deref() {
            None => Ok(None),
            Some(raw) => ThreadId::parse(raw).map(Some).map_err(|_| {
                violations.push("threadId should not be empty".to_string());
            }),
        };

        match (store, thread_id) {
            (Ok(store), Ok(thread_id)) if violations.is_empty() => {
                Ok(ChatCommand { query: self.query, store, thread_id })
            }
            _ => Err(violations),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub content: String,
    pub thread_id: String,
    pub database_type: BackingStore,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody<M> {
    pub status_code: u16,
    pub message: M,
    pub error: String,
}

fn bad_request(messages: Vec<String>) -> Response {
    let body = ErrorBody {
        status_code: StatusCode::BAD_REQUEST.as_u16(),
        message: messages,
        error: "Bad Request".to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn internal_error(detail: &str) -> Response {
    let body = ErrorBody {
        status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        message: FAILURE_MESSAGE,
        error: detail.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/v1/chat", post(chat))
        .with_state(state)
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let validated = match payload {
        Ok(Json(body)) => body.validate(),
        Err(rejection) => Err(vec![rejection.body_text()]),
    };
    let command = match validated {
        Ok(command) => command,
        Err(violations) => {
            warn!(
                event_name = "server.chat.rejected",
                correlation_id = %correlation_id,
                violations = ?violations,
                "chat request failed validation"
            );
            return bad_request(violations);
        }
    };

    let (thread_id, origin) = match command.thread_id {
        Some(thread_id) => (thread_id, ThreadOrigin::Supplied),
        None => (ThreadId::generate(), ThreadOrigin::Generated),
    };
    info!(
        event_name = "server.chat.received",
        correlation_id = %correlation_id,
        thread_id = %thread_id,
        database_type = %command.store,
        "chat request received"
    );

    match state.router.execute(command.store, &command.query, &thread_id, origin).await {
        Ok(response) => {
            let body = ChatResponseBody {
                content: response.content,
                thread_id: thread_id.to_string(),
                database_type: command.store,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(failure) => {
            let error_kind = failure.kind();
            let interface = failure.into_interface(correlation_id.clone());
            error!(
                event_name = "server.chat.failed",
                correlation_id = %correlation_id,
                thread_id = %thread_id,
                database_type = %command.store,
                error_kind,
                error = %interface,
                "chat request failed"
            );
            match interface {
                InterfaceError::BadRequest { message, .. } => bad_request(vec![message]),
                InterfaceError::Internal { user_message, .. } => internal_error(user_message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use chrono::DateTime;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use hrbot_agent::{
        AgentRouter, AgentRuntime, AgentSettings, ChatRequest, EmployeeLookupTool, LlmClient,
        LlmError, ToolRegistry,
    };
    use hrbot_core::{BackingStore, Message, Role, ThreadId, ToolCall};
    use hrbot_db::repositories::{ConversationMemory, InMemoryConversationMemory};
    use hrbot_db::{RepositoryError, VectorSearch};

    use super::{router, ChatState};

    /// Looks employees up on its first call of each turn, then answers.
    struct LookupThenAnswer {
        turns: Mutex<usize>,
    }

    #[async_trait]
    impl LlmClient for LookupThenAnswer {
        async fn chat(&self, request: &ChatRequest<'_>) -> Result<Message, LlmError> {
            let last = request.messages.last().map(|message| message.role);
            if last == Some(Role::User) {
                let mut turns = self.turns.lock().await;
                *turns += 1;
                let call = ToolCall {
                    id: format!("toolu_{turns}"),
                    name: "employee_lookup".to_string(),
                    arguments: json!({ "query": "senior engineers", "n": 5 }),
                };
                return Ok(Message::assistant("", vec![call]));
            }
            Ok(Message::assistant("Ada Lovelace is a senior engineer.", Vec::new()))
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn chat(&self, _request: &ChatRequest<'_>) -> Result<Message, LlmError> {
            Err(LlmError::Status { status: 401, body: "invalid x-api-key".to_string() })
        }
    }

    struct StaticSearch;

    #[async_trait]
    impl VectorSearch for StaticSearch {
        async fn similarity_search(&self, _query: &str, _k: usize) -> Result<String, RepositoryError> {
            Ok(r#"[{"pageContent":"Ada Lovelace","metadata":{},"score":0.92}]"#.to_string())
        }
    }

    fn runtime(
        store: BackingStore,
        llm: Arc<dyn LlmClient>,
        memory: Arc<InMemoryConversationMemory>,
    ) -> AgentRuntime {
        let mut tools = ToolRegistry::default();
        tools.register(EmployeeLookupTool::new(Arc::new(StaticSearch)));
        AgentRuntime::new(
            store,
            llm,
            tools,
            memory,
            AgentSettings { max_steps: 15, call_timeout: Duration::from_secs(5) },
        )
    }

    fn app(llm: Arc<dyn LlmClient>) -> (Router, Arc<InMemoryConversationMemory>) {
        let postgres_memory = Arc::new(InMemoryConversationMemory::default());
        let agents = AgentRouter::new()
            .with_runtime(runtime(BackingStore::Postgres, llm.clone(), postgres_memory.clone()))
            .with_runtime(runtime(
                BackingStore::MongoDb,
                llm,
                Arc::new(InMemoryConversationMemory::default()),
            ));
        (router(ChatState { router: Arc::new(agents) }), postgres_memory)
    }

    fn lookup_llm() -> Arc<dyn LlmClient> {
        Arc::new(LookupThenAnswer { turns: Mutex::new(0) })
    }

    async fn post(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request build should succeed"),
            )
            .await
            .expect("app should handle request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("response body should be readable");
        (status, serde_json::from_slice(&bytes).expect("response body should be json"))
    }

    #[tokio::test]
    async fn new_thread_then_follow_up_stays_on_the_same_store() {
        let (app, postgres_memory) = app(lookup_llm());

        let (status, first) = post(
            app.clone(),
            "/chat",
            json!({ "query": "Find senior engineers", "databaseType": "postgres" }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let thread_id = first["threadId"].as_str().expect("threadId").to_string();
        assert!(!thread_id.is_empty());
        assert_eq!(first["databaseType"], "postgres");
        assert_eq!(first["content"], "Ada Lovelace is a senior engineer.");
        let timestamp = first["timestamp"].as_str().expect("timestamp");
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));

        let (status, second) = post(
            app,
            "/v1/chat",
            json!({
                "query": "List their emails",
                "databaseType": "postgres",
                "threadId": thread_id,
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["threadId"], thread_id.as_str());

        let history = postgres_memory
            .load(&ThreadId::parse(&thread_id).expect("thread id"))
            .await
            .expect("history");
        let users = history
            .iter()
            .filter(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(users, vec!["Find senior engineers", "List their emails"]);
        assert_eq!(history.len(), 8);
        assert_eq!(history[3].content, "Ada Lovelace is a senior engineer.");
    }

    #[tokio::test]
    async fn unsupported_database_type_is_rejected() {
        let (app, _) = app(lookup_llm());

        let (status, body) = post(
            app,
            "/chat",
            json!({ "query": "Find senior engineers", "databaseType": "mysql" }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(
            body["message"][0],
            "databaseType must be one of the following values: mongodb, postgres"
        );
    }

    #[tokio::test]
    async fn extra_and_missing_fields_are_rejected() {
        let (app, _) = app(lookup_llm());

        let (status, body) = post(
            app.clone(),
            "/chat",
            json!({ "query": "Hi", "databaseType": "postgres", "admin": true }).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"][0].as_str().unwrap_or_default().contains("unknown field"));

        let (status, _) =
            post(app.clone(), "/chat", json!({ "databaseType": "postgres" }).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post(app, "/chat", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn every_violation_is_reported() {
        let (app, _) = app(lookup_llm());

        let (status, body) = post(
            app,
            "/chat",
            json!({ "query": " ", "databaseType": "sqlite", "threadId": "" }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn dependency_failure_is_a_sanitised_500() {
        let (app, _) = app(Arc::new(FailingLlm));

        let (status, body) = post(
            app,
            "/chat",
            json!({ "query": "Find senior engineers", "databaseType": "mongodb" }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Failed to process chat request");
        assert!(!body["error"].as_str().unwrap_or_default().contains("x-api-key"));
    }

    #[tokio::test]
    async fn continuing_a_thread_on_another_store_is_a_bad_request() {
        let (app, _) = app(lookup_llm());

        let (_, first) = post(
            app.clone(),
            "/chat",
            json!({ "query": "Find senior engineers", "databaseType": "postgres" }).to_string(),
        )
        .await;
        let (status, body) = post(
            app,
            "/chat",
            json!({
                "query": "List their emails",
                "databaseType": "mongodb",
                "threadId": first["threadId"],
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"][0].as_str().unwrap_or_default().contains("belongs to postgres"));
    }

    #[tokio::test]
    async fn supplied_thread_id_is_echoed_back_unchanged() {
        let (app, postgres_memory) = app(lookup_llm());

        let (status, body) = post(
            app,
            "/chat",
            json!({
                "query": "Find senior engineers",
                "databaseType": "postgres",
                "threadId": " Thread-7 ",
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["threadId"], " Thread-7 ");
        let stored = ThreadId::parse(" Thread-7 ").expect("thread id");
        assert!(postgres_memory.contains(&stored).await.expect("contains"));
    }
}
