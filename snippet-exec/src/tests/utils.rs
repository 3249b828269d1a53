pub mod defaults {
    use crate::{CodeExecutionService, Result, ServiceConfig};
    use std::path::Path;
    use tokio::time::Duration;

    pub fn test_config(scratch_root: &Path) -> ServiceConfig {
        ServiceConfig {
            scratch_root: scratch_root.to_path_buf(),
            max_concurrent: 4,
            max_timeout_secs: 30,
            ..ServiceConfig::default()
        }
    }

    pub async fn test_service(scratch_root: &Path) -> Result<CodeExecutionService> {
        CodeExecutionService::new(test_config(scratch_root)).await
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(5)
    }

    /// JVM start-up plus javac needs more headroom
    pub fn extended_timeout() -> Duration {
        Duration::from_secs(20)
    }
}

pub mod processes {
    /// Whether `pid` is a live (non-zombie) process
    #[cfg(target_os = "linux")]
    pub fn is_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            // State is the first field after the parenthesised command name
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .map(|state| state != "Z" && state != "X")
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn is_alive(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid), None).is_ok()
    }
}

pub mod scratch {
    use std::path::{Path, PathBuf};

    /// Entries left under the scratch root
    pub fn leftovers(scratch_root: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(scratch_root)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    pub fn assert_empty(scratch_root: &Path) {
        let leftovers = leftovers(scratch_root);
        assert!(leftovers.is_empty(), "leaked workspaces: {:?}", leftovers);
    }
}
