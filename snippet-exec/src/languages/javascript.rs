use crate::{languages::LanguageAdapter, supervisor::CommandLine, types::Language};

pub struct JavaScriptAdapter {
    node: String,
}

impl JavaScriptAdapter {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn file_extension(&self) -> &str {
        "js"
    }

    fn run_command(&self, base_name: &str) -> CommandLine {
        CommandLine::new(&self.node).arg(self.source_file_name(base_name))
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.node.as_str()]
    }
}
