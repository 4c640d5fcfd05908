pub mod config;
pub mod domain;
pub mod embedding;
pub mod errors;

pub use domain::employee::EmployeeRecord;
pub use domain::message::{Message, Role, ToolCall};
pub use domain::thread::{BackingStore, ThreadId};
pub use embedding::{Embedder, EmbeddingError};
pub use errors::{ApplicationError, DomainError, InterfaceError};
