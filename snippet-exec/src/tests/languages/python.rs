use super::*;
use crate::tests::fixtures::{
    code_samples::{HELLO_OUTPUT, PYTHON_HELLO},
    syntax_errors,
    test_scenarios::*,
};

const TOOLS: &[&str] = &["python3"];

#[tokio::test]
async fn test_python_basic() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Python, PYTHON_HELLO, Outcome::Success).await? {
        assert_eq!(result.stdout, HELLO_OUTPUT);
        assert!(result.stderr.is_empty());
        assert_eq!(result.exit_code, Some(0));
    }
    Ok(())
}

#[tokio::test]
async fn test_python_syntax_error_is_runtime_error() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Python, syntax_errors::PYTHON, Outcome::RuntimeError).await?
    {
        assert!(result.stderr.contains("SyntaxError"));
        // Tracebacks name the file relative to the workspace
        assert!(!result.stderr.contains("run-"));
    }
    Ok(())
}

#[tokio::test]
async fn test_python_non_zero_exit() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Python, PYTHON_EXIT_CODE, Outcome::RuntimeError).await?
    {
        assert_eq!(result.stdout, "before exit\n");
        assert_eq!(result.exit_code, Some(3));
    }
    Ok(())
}

#[tokio::test]
async fn test_python_stderr_with_zero_exit_is_error() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Python, PYTHON_STDERR_ONLY, Outcome::RuntimeError).await?
    {
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stderr, "just a warning\n");
    }
    Ok(())
}

#[tokio::test]
async fn test_python_timeout() -> Result<()> {
    expect_timeout(TOOLS, Language::Python, PYTHON_INFINITE_LOOP).await
}

#[tokio::test]
async fn test_python_large_output_truncated() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Python, PYTHON_LARGE_OUTPUT, Outcome::Success).await?
    {
        assert!(result.stdout.ends_with(crate::TRUNCATION_MARKER));
        assert!(result.stdout.len() <= 1024 * 1024 + crate::TRUNCATION_MARKER.len());
    }
    Ok(())
}

#[tokio::test]
async fn test_python_long_timeout_is_still_timeout() -> Result<()> {
    let timeout = Duration::from_secs(15);
    let started = std::time::Instant::now();
    if let Some(result) = run_snippet(TOOLS, Language::Python, PYTHON_INFINITE_LOOP, timeout).await? {
        assert_eq!(result.outcome, Outcome::Timeout, "unexpected result: {:?}", result);
        assert!(started.elapsed() >= timeout);
        assert!(started.elapsed() < timeout + Duration::from_secs(5));
    }
    Ok(())
}

#[tokio::test]
async fn test_python_new_session_grandchild_killed() -> Result<()> {
    let timeout = Duration::from_secs(2);
    if let Some(result) =
        run_snippet(TOOLS, Language::Python, PYTHON_SETSID_GRANDCHILD, timeout).await?
    {
        assert_eq!(result.outcome, Outcome::Timeout, "unexpected result: {:?}", result);
        let pid: i32 = result.stdout.trim().parse().expect("grandchild pid");

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while crate::tests::utils::processes::is_alive(pid) {
            assert!(std::time::Instant::now() < deadline, "grandchild {} survived", pid);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
    Ok(())
}
