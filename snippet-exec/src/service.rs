use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, info, warn};

use crate::{
    config::ServiceConfig,
    error::Error,
    executor::{failure_result, CodeExecutor},
    languages::AdapterRegistry,
    supervisor::{ProcessRunner, Supervisor},
    types::{ExecutionRequest, ExecutionResult, Language, Outcome},
};

/// Request dispatcher: validates, admits under the concurrency ceiling, and
/// hands the request to the executor. Cheap to clone.
#[derive(Clone)]
pub struct CodeExecutionService {
    executor: Arc<CodeExecutor>,
    semaphore: Arc<Semaphore>,
    config: Arc<ServiceConfig>,
}

impl CodeExecutionService {
    pub async fn new(config: ServiceConfig) -> Result<Self, Error> {
        let supervisor = Supervisor::new(config.limits.clone(), config.max_output_bytes);
        let service = Self::with_runner(config, Arc::new(supervisor))?;

        for (language, reason) in service.executor.registry().unavailable() {
            warn!(language = %language, "Toolchain unavailable: {}", reason);
        }
        Ok(service)
    }

    /// Service backed by a custom process runner
    pub fn with_runner(config: ServiceConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self, Error> {
        config.validate()?;
        let registry = AdapterRegistry::new(&config.toolchains);
        let executor = CodeExecutor::new(registry, runner, config.scratch_root.clone());

        Ok(Self {
            executor: Arc::new(executor),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            config: Arc::new(config),
        })
    }

    /// Entry point for raw caller input. An unknown language yields an
    /// `InvalidLanguage` result without any side effect.
    pub async fn submit(
        &self,
        language: &str,
        code: String,
        timeout: Option<Duration>,
    ) -> Result<ExecutionResult, Error> {
        let language = match self.executor.registry().resolve_id(language) {
            Ok(adapter) => adapter.language(),
            Err(e) => {
                info!(requested = %language.escape_debug(), "Rejected unsupported language");
                return Ok(ExecutionResult::without_process(
                    Outcome::InvalidLanguage,
                    e.to_string(),
                ));
            }
        };

        self.execute(ExecutionRequest {
            language,
            code,
            timeout: self.config.effective_timeout(timeout),
        })
        .await
    }

    /// `Err` only when the request was not admitted; every admitted request
    /// gets a classified result.
    pub async fn execute(&self, mut request: ExecutionRequest) -> Result<ExecutionResult, Error> {
        if !self.executor.registry().contains(request.language) {
            let error = Error::UnsupportedLanguage(request.language.to_string());
            return Ok(failure_result(request.language, &error));
        }

        if request.code.len() > self.config.max_source_bytes {
            return Err(Error::SourceTooLarge {
                size: request.code.len(),
                limit: self.config.max_source_bytes,
            });
        }
        request.timeout = self.config.effective_timeout(Some(request.timeout));

        // Acquire execution permit
        let _permit = match time::timeout(
            self.config.queue_timeout(),
            self.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => {
                return Err(Error::Config(format!("Execution semaphore closed: {}", e)));
            }
            Err(_) => {
                warn!(language = %request.language, "No execution slot available");
                return Err(Error::Busy(self.config.queue_timeout_ms));
            }
        };

        debug!(
            language = %request.language,
            timeout_ms = request.timeout.as_millis() as u64,
            "Starting code execution"
        );
        Ok(self.executor.execute(&request).await)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.executor.registry().languages()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
