use super::*;
use crate::tests::fixtures::{
    code_samples::{HELLO_OUTPUT, JAVA_HELLO, JAVA_NAMED_HELLO},
    syntax_errors,
    test_scenarios::{JAVA_EXCEPTION, JAVA_NO_MAIN_CLASS, JAVA_PACKAGE_PRIVATE_MAIN},
};

const TOOLS: &[&str] = &["javac", "java"];

#[tokio::test]
async fn test_java_basic() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Java, JAVA_HELLO, Outcome::Success).await? {
        assert_eq!(result.stdout, HELLO_OUTPUT);
        assert!(result.stderr.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_java_public_class_names_the_file() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Java, JAVA_NAMED_HELLO, Outcome::Success).await? {
        assert_eq!(result.stdout, HELLO_OUTPUT);
    }
    Ok(())
}

#[tokio::test]
async fn test_java_defaults_to_main() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Java, JAVA_PACKAGE_PRIVATE_MAIN, Outcome::Success).await?
    {
        assert_eq!(result.stdout, "package-private\n");
    }
    Ok(())
}

#[tokio::test]
async fn test_java_without_main_class_fails_at_run() -> Result<()> {
    expect_outcome(TOOLS, Language::Java, JAVA_NO_MAIN_CLASS, Outcome::RuntimeError).await?;
    Ok(())
}

#[tokio::test]
async fn test_java_compile_error() -> Result<()> {
    if let Some(result) =
        expect_outcome(TOOLS, Language::Java, syntax_errors::JAVA, Outcome::CompileError).await?
    {
        assert!(result.stderr.contains("Main.java"));
        assert!(result.stdout.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_java_runtime_exception() -> Result<()> {
    if let Some(result) = expect_outcome(TOOLS, Language::Java, JAVA_EXCEPTION, Outcome::RuntimeError).await? {
        assert!(result.stderr.contains("ArrayIndexOutOfBoundsException"));
        assert_eq!(result.exit_code, Some(1));
    }
    Ok(())
}
