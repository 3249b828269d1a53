use crate::{languages::LanguageAdapter, supervisor::CommandLine, types::Language};

pub struct JavaAdapter {
    javac: String,
    java: String,
}

impl JavaAdapter {
    pub fn new(javac: impl Into<String>, java: impl Into<String>) -> Self {
        Self {
            javac: javac.into(),
            java: java.into(),
        }
    }
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn file_extension(&self) -> &str {
        "java"
    }

    // javac rejects a public class whose name differs from its file name
    fn requires_named_entry_point(&self) -> bool {
        true
    }

    fn compile_command(&self, base_name: &str) -> Option<CommandLine> {
        Some(
            CommandLine::new(&self.javac)
                .args(["-encoding", "UTF-8"])
                .arg(self.source_file_name(base_name)),
        )
    }

    fn run_command(&self, base_name: &str) -> CommandLine {
        CommandLine::new(&self.java).args(["-cp", "."]).arg(base_name)
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.javac.as_str(), self.java.as_str()]
    }
}
