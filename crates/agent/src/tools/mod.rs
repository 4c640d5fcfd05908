use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use hrbot_core::ApplicationError;
use hrbot_db::RepositoryError;

pub mod employee_lookup;

pub use employee_lookup::{EmployeeLookupArgs, EmployeeLookupTool};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("search failed: {0}")]
    Search(#[from] RepositoryError),
}

impl From<ToolError> for ApplicationError {
    fn from(value: ToolError) -> Self {
        match value {
            ToolError::InvalidArguments(message) => Self::Validation(message),
            ToolError::Search(error) => Self::dependency("vector search", error.to_string()),
        }
    }
}

/// What the model sees of a tool: name, description, JSON schema of its input.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn schema(&self) -> ToolSchema;
    /// Validates `arguments` and returns the observation handed back to the model.
    async fn invoke(&self, arguments: &Value) -> Result<String, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| &**tool)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|tool| tool.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
