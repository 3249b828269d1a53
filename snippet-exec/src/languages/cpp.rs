use crate::{languages::LanguageAdapter, supervisor::CommandLine, types::Language};

pub struct CppAdapter {
    compiler: String,
    std_version: String,
}

impl CppAdapter {
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            std_version: "17".to_string(),
        }
    }
}

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn file_extension(&self) -> &str {
        "cpp"
    }

    fn compile_command(&self, base_name: &str) -> Option<CommandLine> {
        Some(
            CommandLine::new(&self.compiler)
                .arg(format!("-std=c++{}", self.std_version))
                .arg("-O2")
                .args(["-o", base_name])
                .arg(self.source_file_name(base_name)),
        )
    }

    fn run_command(&self, base_name: &str) -> CommandLine {
        CommandLine::new(format!("./{}", base_name))
    }

    fn required_tools(&self) -> Vec<&str> {
        vec![self.compiler.as_str()]
    }
}
