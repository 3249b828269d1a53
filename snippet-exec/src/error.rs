use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid entry point name: {0}")]
    InvalidEntryPoint(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Process error: {0}")]
    Process(String),

    #[error("No execution slot became available within {0} ms")]
    Busy(u64),

    #[error("Source is {size} bytes, limit is {limit}")]
    SourceTooLarge { size: usize, limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
