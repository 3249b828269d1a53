use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{
    classifier::{classify, classify_error, Stage},
    entry_point::resolve_file_base_name,
    error::Error,
    languages::{AdapterRegistry, LanguageAdapter},
    supervisor::{ProcessOutput, ProcessRunner},
    types::{ExecutionRequest, ExecutionResult, Language, Outcome},
    workspace::Workspace,
};

/// Runs one request: entry-point resolution, workspace, compile, run,
/// classification. The workspace never outlives `execute`.
pub struct CodeExecutor {
    registry: AdapterRegistry,
    runner: Arc<dyn ProcessRunner>,
    scratch_root: PathBuf,
}

impl CodeExecutor {
    pub fn new(
        registry: AdapterRegistry,
        runner: Arc<dyn ProcessRunner>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            runner,
            scratch_root: scratch_root.into(),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let adapter = match self.registry.resolve(request.language) {
            Ok(adapter) => adapter,
            Err(e) => return failure_result(request.language, &e),
        };

        let base_name = resolve_file_base_name(adapter, &request.code);
        let workspace = match Workspace::create(
            &self.scratch_root,
            &base_name,
            adapter.file_extension(),
            &request.code,
        )
        .await
        {
            Ok(workspace) => workspace,
            Err(e) => return failure_result(request.language, &e),
        };

        let mut result = self
            .run_in_workspace(adapter, &workspace, request.timeout)
            .await;
        result.stdout = workspace.redact(&result.stdout);
        result.stderr = workspace.redact(&result.stderr);

        if let Err(e) = workspace.destroy().await {
            warn!(language = %request.language, "Workspace cleanup failed: {}", e);
        }

        info!(
            language = %request.language,
            outcome = %result.outcome,
            exit_code = ?result.exit_code,
            elapsed_ms = result.elapsed_ms,
            "Execution finished"
        );
        result
    }

    async fn run_in_workspace(
        &self,
        adapter: &dyn LanguageAdapter,
        workspace: &Workspace,
        timeout: Duration,
    ) -> ExecutionResult {
        let language = adapter.language();
        let mut elapsed = Duration::ZERO;

        if let Some(compile) = adapter.compile_command(workspace.base_name()) {
            debug!(language = %language, command = %compile, "Compiling");
            let output = match self.runner.run(&compile, workspace.root(), timeout).await {
                Ok(output) => output,
                Err(e) => return failure_result(language, &e),
            };
            elapsed += output.elapsed;

            let outcome = classify(Stage::Compile, &output);
            if outcome != Outcome::Success {
                return process_result(outcome, output, elapsed);
            }
        }

        let run = adapter.run_command(workspace.base_name());
        debug!(language = %language, command = %run, "Running");
        match self.runner.run(&run, workspace.root(), timeout).await {
            Ok(output) => {
                elapsed += output.elapsed;
                process_result(classify(Stage::Run, &output), output, elapsed)
            }
            Err(e) => failure_result(language, &e),
        }
    }
}

fn process_result(outcome: Outcome, output: ProcessOutput, elapsed: Duration) -> ExecutionResult {
    ExecutionResult {
        outcome,
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.exit_code,
        elapsed_ms: elapsed.as_millis() as u64,
    }
}

/// Result for an error that happened outside any process; host details
/// are logged here and kept out of the result.
pub(crate) fn failure_result(language: Language, error: &Error) -> ExecutionResult {
    let outcome = classify_error(error);
    let message = match error {
        Error::UnsupportedLanguage(id) => format!("Unsupported language: {}", id),
        Error::InvalidEntryPoint(_) => "Declared entry point cannot be used as a file name".into(),
        Error::Launch { .. } => format!("Toolchain for {} is unavailable", language),
        _ => "Execution environment error".into(),
    };

    match outcome {
        Outcome::LaunchError => error!(language = %language, "Execution could not start: {}", error),
        _ => info!(language = %language, outcome = %outcome, "Execution rejected: {}", error),
    }
    ExecutionResult::without_process(outcome, message)
}
