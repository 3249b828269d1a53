//! Derives the source file's base name before anything touches the disk.

use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::languages::LanguageAdapter;

/// Name used when a named-entry-point language declares no public type
pub const DEFAULT_ENTRY_POINT: &str = "Main";

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("valid comment pattern"));

static PUBLIC_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bpublic\s+(?:(?:final|abstract|static|strictfp|sealed|non-sealed)\s+)*(?:class|interface|enum|record)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .expect("valid public type pattern")
});

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File base name for `source` in the given language: the first public
/// top-level type for named-entry-point languages, a unique token otherwise.
pub fn resolve_file_base_name(adapter: &dyn LanguageAdapter, source: &str) -> String {
    if adapter.requires_named_entry_point() {
        public_type_name(source).unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string())
    } else {
        unique_token()
    }
}

/// First `public class|interface|enum|record Name` outside comments
pub fn public_type_name(source: &str) -> Option<String> {
    let stripped = COMMENTS.replace_all(source, " ");
    PUBLIC_TYPE
        .captures(&stripped)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `temp_<unix millis>_<counter>`; unique within the process
pub fn unique_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("temp_{}_{}", millis, seq)
}
