use super::*;
use crate::tests::fixtures::{
    code_samples::{CPP_HELLO, HELLO_OUTPUT},
    syntax_errors,
    test_scenarios::{CPP_INFINITE_LOOP, CPP_SEGFAULT},
};

const TOOLS: &[&str] = &["g++"];

#[tokio::test]
async fn test_cpp_basic() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Cpp, CPP_HELLO, Outcome::Success).await? {
        assert_eq!(result.stdout, HELLO_OUTPUT);
        assert!(result.stderr.is_empty());
        assert_eq!(result.exit_code, Some(0));
    }
    Ok(())
}

#[tokio::test]
async fn test_cpp_compile_error() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Cpp, syntax_errors::CPP, Outcome::CompileError).await? {
        assert!(result.stderr.contains("undeclared_name"));
        assert_eq!(result.exit_code, Some(1));
    }
    Ok(())
}

#[tokio::test]
async fn test_cpp_segfault_is_runtime_error() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Cpp, CPP_SEGFAULT, Outcome::RuntimeError).await? {
        assert_eq!(result.exit_code, None);
        assert!(result.stderr.contains("signal"));
    }
    Ok(())
}

#[tokio::test]
async fn test_cpp_timeout() -> Result<()> {
    if skip_if_not_available(TOOLS) {
        return Ok(());
    }
    // The compile step shares the budget and must finish well inside it
    let result = run_snippet(TOOLS, Language::Cpp, CPP_INFINITE_LOOP, Duration::from_secs(4))
        .await?
        .expect("g++ available");
    assert_eq!(result.outcome, Outcome::Timeout);
    Ok(())
}
