use super::utils::{defaults::*, scratch};
use crate::{languages::skip_if_not_available, ExecutionResult, Language, Outcome, Result};
use tempfile::tempdir;
use tokio::time::Duration;

pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

/// Run `code` through a fresh service and check the workspace was removed.
/// `None` when the toolchain is not installed.
pub(crate) async fn run_snippet(
    tools: &[&str],
    language: Language,
    code: &str,
    timeout: Duration,
) -> Result<Option<ExecutionResult>> {
    if skip_if_not_available(tools) {
        return Ok(None);
    }

    let scratch_dir = tempdir()?;
    let service = test_service(scratch_dir.path()).await?;
    let result = service
        .submit(language.as_str(), code.to_string(), Some(timeout))
        .await?;

    scratch::assert_empty(scratch_dir.path());
    Ok(Some(result))
}

pub(crate) async fn expect_outcome(
    tools: &[&str],
    language: Language,
    code: &str,
    expected: Outcome,
) -> Result<Option<ExecutionResult>> {
    let timeout = match language {
        Language::Java | Language::Cpp => extended_timeout(),
        _ => default_timeout(),
    };
    let result = run_snippet(tools, language, code, timeout).await?;
    if let Some(result) = &result {
        assert_eq!(result.outcome, expected, "unexpected result: {:?}", result);
    }
    Ok(result)
}

pub(crate) async fn expect_timeout(tools: &[&str], language: Language, code: &str) -> Result<()> {
    let timeout = Duration::from_secs(2);
    let started = std::time::Instant::now();
    if let Some(result) = run_snippet(tools, language, code, timeout).await? {
        assert_eq!(result.outcome, Outcome::Timeout, "unexpected result: {:?}", result);
        assert_eq!(result.exit_code, None);
        // Compile step and run step each get the full budget
        assert!(started.elapsed() < timeout * 2 + Duration::from_secs(3));
    }
    Ok(())
}
