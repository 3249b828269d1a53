use super::*;
use crate::tests::fixtures::{
    code_samples::{HELLO_OUTPUT, JS_HELLO},
    syntax_errors,
    test_scenarios::{JS_INFINITE_TIMER, JS_THROW},
};

const TOOLS: &[&str] = &["node"];

#[tokio::test]
async fn test_javascript_basic() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::JavaScript, JS_HELLO, Outcome::Success).await? {
        assert_eq!(result.stdout, HELLO_OUTPUT);
        assert!(result.stderr.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_javascript_syntax_error_is_runtime_error() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::JavaScript, syntax_errors::JS, Outcome::RuntimeError).await?
    {
        assert!(result.stderr.contains("SyntaxError"));
    }
    Ok(())
}

#[tokio::test]
async fn test_javascript_uncaught_exception() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::JavaScript, JS_THROW, Outcome::RuntimeError).await? {
        assert!(result.stderr.contains("boom"));
        assert_ne!(result.exit_code, Some(0));
    }
    Ok(())
}

#[tokio::test]
async fn test_javascript_timeout() -> Result<()> {
    expect_timeout(TOOLS, Language::JavaScript, JS_INFINITE_TIMER).await
}
