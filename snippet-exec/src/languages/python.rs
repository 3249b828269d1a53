use crate::{languages::LanguageAdapter, supervisor::CommandLine, types::Language};

pub struct PythonAdapter {
    interpreter: String,
}

impl PythonAdapter {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extension(&self) -> &str {
        "py"
    }

    fn run_command(&self, base_name: &str) -> CommandLine {
        // -B keeps the interpreter from writing __pycache__ into the workspace
        CommandLine::new(&self.interpreter)
            .arg("-B")
            .arg(self.source_file_name(base_name))
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.interpreter.as_str()]
    }
}
