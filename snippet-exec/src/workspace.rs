use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::Error;

/// Longest accepted file name component, leaving room for build artifacts
/// next to the source within the usual 255-byte limit
const MAX_NAME_BYTES: usize = 200;

/// Per-request scratch directory holding the submitted source and any
/// build artifacts. Removed by [`Workspace::destroy`], or by `Drop` on
/// every other exit path.
#[derive(Debug)]
pub struct Workspace {
    /// Per-request directory, a direct child of the scratch root
    root: PathBuf,
    /// Canonical form of `root`, when it differs
    canonical_root: Option<PathBuf>,
    source_path: PathBuf,
    base_name: String,
    created_at: SystemTime,
    removed: bool,
}

impl Workspace {
    /// Create `scratch_root/run-<uuid>/<base_name>.<extension>` containing `source`
    pub async fn create(
        scratch_root: &Path,
        base_name: &str,
        extension: &str,
        source: &str,
    ) -> Result<Self, Error> {
        validate_file_component(base_name)?;
        validate_file_component(extension)?;

        // create_dir_all tolerates a concurrent creator
        fs::create_dir_all(scratch_root).await.map_err(|e| {
            Error::Workspace(format!("Failed to create scratch root: {}", e))
        })?;

        let root = scratch_root.join(format!("run-{}", Uuid::new_v4()));
        fs::create_dir(&root)
            .await
            .map_err(|e| Error::Workspace(format!("Failed to create workspace: {}", e)))?;

        let canonical_root = fs::canonicalize(&root)
            .await
            .ok()
            .filter(|canonical| canonical != &root);

        // From here on, Drop owns removal
        let workspace = Workspace {
            source_path: root.join(format!("{}.{}", base_name, extension)),
            root,
            canonical_root,
            base_name: base_name.to_string(),
            created_at: SystemTime::now(),
            removed: false,
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&workspace.root, std::fs::Permissions::from_mode(0o700))
                .await
                .map_err(|e| Error::Workspace(format!("Failed to restrict workspace: {}", e)))?;
        }

        fs::write(&workspace.source_path, source)
            .await
            .map_err(|e| Error::Workspace(format!("Failed to write source file: {}", e)))?;

        debug!(workspace = %workspace.root.display(), "Created workspace");
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Replace every mention of the workspace location with `.`
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for root in std::iter::once(&self.root).chain(self.canonical_root.as_ref()) {
            let needle = root.display().to_string();
            if !needle.is_empty() && redacted.contains(&needle) {
                redacted = redacted.replace(&needle, ".");
            }
        }
        redacted
    }

    /// Remove the workspace and everything in it
    pub async fn destroy(mut self) -> Result<(), Error> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                self.removed = true;
                debug!(workspace = %self.root.display(), "Removed workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.removed = true;
                Ok(())
            }
            // Drop retries once more
            Err(e) => Err(Error::Workspace(format!(
                "Failed to remove workspace {}: {}",
                self.root.display(),
                e
            ))),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(workspace = %self.root.display(), "Removed workspace on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(
                workspace = %self.root.display(),
                "Failed to clean up workspace directory: {}", e
            ),
        }
    }
}

/// A name that stays inside its directory: one normal path component,
/// no separators, no leading dot, short enough to create.
fn validate_file_component(name: &str) -> Result<(), Error> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.is_empty()
        || !single_normal
        || name.len() > MAX_NAME_BYTES
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        warn!(name = %name.escape_debug(), "Rejected workspace file name");
        return Err(Error::InvalidEntryPoint(name.escape_debug().to_string()));
    }
    Ok(())
}
