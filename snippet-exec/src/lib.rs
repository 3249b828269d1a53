//! # Snippet Execution Service
//!
//! Compiles and runs untrusted source code in a throwaway workspace and
//! returns captured output with a classified outcome. Supports Python,
//! JavaScript, Java and C++ through pluggable language adapters.

mod classifier;
mod config;
mod entry_point;
mod error;
mod executor;
mod languages;
mod process_tree;
mod service;
mod supervisor;
mod types;
mod workspace;

#[cfg(test)]
mod tests;

pub use classifier::{classify, classify_error, Stage};
pub use config::{ServiceConfig, Toolchains};
pub use entry_point::{resolve_file_base_name, DEFAULT_ENTRY_POINT};
pub use error::Error;
pub use executor::CodeExecutor;
pub use languages::{
    AdapterRegistry, CppAdapter, JavaAdapter, JavaScriptAdapter, LanguageAdapter, PythonAdapter,
};
pub use service::CodeExecutionService;
pub use supervisor::{CommandLine, ProcessOutput, ProcessRunner, Supervisor, TRUNCATION_MARKER};
pub use types::{ExecutionRequest, ExecutionResult, Language, Outcome, ResourceLimits};
pub use workspace::Workspace;

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
