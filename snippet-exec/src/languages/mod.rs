//! Language-specific build/run recipes and the registry that holds them

mod cpp;
mod java;
mod javascript;
mod python;

pub use cpp::CppAdapter;
pub use java::JavaAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;

use std::collections::HashMap;
use which::which;

use crate::{config::Toolchains, error::Error, supervisor::CommandLine, types::Language};

/// Static description of how to compile and run one language.
///
/// Commands name files relative to the workspace directory, which is the
/// working directory of every step.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Get the file extension for source files
    fn file_extension(&self) -> &str;

    /// Whether the source file must be named after a declared top-level type
    fn requires_named_entry_point(&self) -> bool {
        false
    }

    /// Command that translates `base_name.<ext>` into something runnable
    fn compile_command(&self, _base_name: &str) -> Option<CommandLine> {
        None
    }

    /// Command that runs the program
    fn run_command(&self, base_name: &str) -> CommandLine;

    fn required_tools(&self) -> Vec<&str>;

    fn source_file_name(&self, base_name: &str) -> String {
        format!("{}.{}", base_name, self.file_extension())
    }

    /// Check if all required tools are available on `PATH`
    fn check_tools(&self) -> Result<(), Error> {
        let missing: Vec<_> = self
            .required_tools()
            .iter()
            .filter(|tool| which(tool).is_err())
            .map(|s| (*s).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(Error::Launch {
                program: missing.join(", "),
                reason: "not found on PATH".to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only map from language to adapter, built once at startup.
pub struct AdapterRegistry {
    adapters: HashMap<Language, Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Registry with every built-in language
    pub fn new(toolchains: &Toolchains) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PythonAdapter::new(&toolchains.python)));
        registry.register(Box::new(JavaScriptAdapter::new(&toolchains.node)));
        registry.register(Box::new(JavaAdapter::new(&toolchains.javac, &toolchains.java)));
        registry.register(Box::new(CppAdapter::new(&toolchains.cxx)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Box<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn resolve(&self, language: Language) -> Result<&dyn LanguageAdapter, Error> {
        self.adapters
            .get(&language)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))
    }

    /// Resolve a caller-supplied identifier such as `"python"` or `"c++"`
    pub fn resolve_id(&self, id: &str) -> Result<&dyn LanguageAdapter, Error> {
        let language: Language = id.parse()?;
        self.resolve(language)
    }

    pub fn contains(&self, language: Language) -> bool {
        self.adapters.contains_key(&language)
    }

    /// Registered languages in declaration order
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.contains(*language))
            .collect()
    }

    /// Languages whose toolchain is not installed, with the reason
    pub fn unavailable(&self) -> Vec<(Language, Error)> {
        self.languages()
            .into_iter()
            .filter_map(|language| {
                let adapter = self.adapters.get(&language)?;
                adapter.check_tools().err().map(|e| (language, e))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
