//! Maps supervisor outcomes onto the response taxonomy.
//!
//! Any text on the diagnostic stream counts as failure, even with exit
//! status zero. Warning-tolerant policies belong above this layer.

use crate::{error::Error, supervisor::ProcessOutput, types::Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Run,
}

pub fn classify(stage: Stage, output: &ProcessOutput) -> Outcome {
    if output.timed_out {
        return Outcome::Timeout;
    }

    let failed = output.exit_code != Some(0) || !output.stderr.is_empty();
    match (stage, failed) {
        (_, false) => Outcome::Success,
        (Stage::Compile, true) => Outcome::CompileError,
        (Stage::Run, true) => Outcome::RuntimeError,
    }
}

/// Outcome for a step that produced no process output at all
pub fn classify_error(error: &Error) -> Outcome {
    match error {
        Error::UnsupportedLanguage(_) => Outcome::InvalidLanguage,
        // The declared type name cannot be used as a file name
        Error::InvalidEntryPoint(_) => Outcome::CompileError,
        _ => Outcome::LaunchError,
    }
}
