use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use hrbot_db::VectorSearch;

use super::{Tool, ToolError, ToolSchema};

pub const TOOL_NAME: &str = "employee_lookup";
pub const DEFAULT_RESULT_COUNT: usize = 10;

const DESCRIPTION: &str = "Gathers employee details from the HR database using semantic search. \
Use this tool to find employees based on skills, departments, roles, names, or any other relevant criteria.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeLookupArgs {
    pub query: String,
    pub n: usize,
}

impl EmployeeLookupArgs {
    pub fn parse(arguments: &Value) -> Result<Self, ToolError> {
        let object = arguments
            .as_object()
            .ok_or_else(|| ToolError::InvalidArguments("arguments must be an object".to_string()))?;

        let query = object
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments("`query` must be a non-empty string".to_string())
            })?;

        let n = match object.get("n") {
            None | Some(Value::Null) => DEFAULT_RESULT_COUNT,
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    ToolError::InvalidArguments("`n` must be a positive integer".to_string())
                })?,
        };

        Ok(Self { query: query.to_string(), n })
    }
}

/// Semantic search over employee records, bound to one backing store.
pub struct EmployeeLookupTool {
    search: Arc<dyn VectorSearch>,
}

impl EmployeeLookupTool {
    pub fn new(search: Arc<dyn VectorSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for EmployeeLookupTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query" },
                    "n": {
                        "type": "integer",
                        "minimum": 1,
                        "default": DEFAULT_RESULT_COUNT,
                        "description": "Number of results to return"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ToolError> {
        let args = EmployeeLookupArgs::parse(arguments)?;
        info!(
            event_name = "agent.tool.employee_lookup",
            query = %args.query,
            n = args.n,
            "employee lookup invoked"
        );

        Ok(self.search.similarity_search(&args.query, args.n).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{EmployeeLookupArgs, EmployeeLookupTool, DEFAULT_RESULT_COUNT};
    use crate::test_support::FixedSearch;
    use crate::tools::{Tool, ToolError};

    #[test]
    fn empty_query_is_rejected() {
        let error = EmployeeLookupArgs::parse(&json!({ "query": "", "n": 5 })).expect_err("empty");
        assert!(matches!(error, ToolError::InvalidArguments(_)));

        let blank = EmployeeLookupArgs::parse(&json!({ "query": "   " })).expect_err("blank");
        assert!(matches!(blank, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn non_positive_or_fractional_n_is_rejected() {
        for n in [json!(0), json!(-3), json!(2.5), json!("5")] {
            let error = EmployeeLookupArgs::parse(&json!({ "query": "engineer", "n": n }))
                .expect_err("n should be rejected");
            assert!(matches!(error, ToolError::InvalidArguments(_)));
        }
    }

    #[test]
    fn n_defaults_to_ten() {
        let args = EmployeeLookupArgs::parse(&json!({ "query": "engineer" })).expect("valid");
        assert_eq!(args, EmployeeLookupArgs { query: "engineer".to_string(), n: 10 });
        assert_eq!(DEFAULT_RESULT_COUNT, 10);
    }

    #[tokio::test]
    async fn returns_search_output_verbatim() {
        let search = Arc::new(FixedSearch::new(r#"[{"pageContent":"Ada","metadata":{},"score":0.9}]"#));
        let tool = EmployeeLookupTool::new(search.clone());

        let output = tool.invoke(&json!({ "query": "Ada", "n": 3 })).await.expect("invoke");

        assert_eq!(output, r#"[{"pageContent":"Ada","metadata":{},"score":0.9}]"#);
        assert_eq!(search.calls().await, vec![("Ada".to_string(), 3)]);
    }

    #[tokio::test]
    async fn no_results_is_not_an_error() {
        let tool = EmployeeLookupTool::new(Arc::new(FixedSearch::new("[]")));
        assert_eq!(tool.invoke(&json!({ "query": "astronaut" })).await.expect("invoke"), "[]");
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        let tool = EmployeeLookupTool::new(Arc::new(FixedSearch::failing()));
        let error = tool.invoke(&json!({ "query": "engineer" })).await.expect_err("should fail");
        assert!(matches!(error, ToolError::Search(_)));
    }
}
