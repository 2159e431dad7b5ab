//! On-disk workspace layout.
//!
//! ```text
//! <root>/AtomeFiles/
//!     Projects/
//!     Exports/
//!     Recordings/      <- default diagnostic log directory
//!     README.txt
//! ```
//!
//! Preparing an existing workspace is a no-op: nothing is overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Name of the workspace directory under the chosen root.
pub const WORKSPACE_DIR: &str = "AtomeFiles";

const SUBDIRECTORIES: [&str; 3] = ["Projects", "Exports", "Recordings"];

#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o755;

/// A prepared workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// The `AtomeFiles` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("Projects")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("Exports")
    }

    /// Where diagnostic captures go.
    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join("Recordings")
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join("README.txt")
    }
}

/// Create the workspace under `root`, filling in whatever is missing.
pub fn prepare_workspace(root: impl AsRef<Path>) -> Result<Workspace, StorageError> {
    let workspace = Workspace {
        root: root.as_ref().join(WORKSPACE_DIR),
    };

    create_dir(&workspace.root)?;
    for name in SUBDIRECTORIES {
        create_dir(&workspace.root.join(name))?;
    }

    let readme = workspace.readme_path();
    if !readme.exists() {
        fs::write(&readme, readme_text()).map_err(|source| StorageError {
            path: readme.clone(),
            source,
        })?;
        log::debug!("created {}", readme.display());
    }

    Ok(workspace)
}

fn create_dir(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        return Ok(());
    }
    build_dir(path).map_err(|source| StorageError {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("created directory {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn build_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIRECTORY_MODE)
        .create(path)
}

#[cfg(not(unix))]
fn build_dir(path: &Path) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}

fn readme_text() -> String {
    format!(
        "Welcome to Atome!\n\
         \n\
         Folder structure:\n\
         - Projects: Store your project files\n\
         - Exports: Find your exported files\n\
         - Recordings: Access your recorded audio files\n\
         \n\
         Created on: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_layout() {
        let dir = TempDir::new().unwrap();
        let workspace = prepare_workspace(dir.path()).unwrap();

        assert_eq!(workspace.root(), dir.path().join("AtomeFiles"));
        assert!(workspace.projects_dir().is_dir());
        assert!(workspace.exports_dir().is_dir());
        assert!(workspace.recordings_dir().is_dir());
        let readme = fs::read_to_string(workspace.readme_path()).unwrap();
        assert!(readme.starts_with("Welcome to Atome!"));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = prepare_workspace(dir.path()).unwrap();
        fs::write(workspace.readme_path(), "edited").unwrap();

        let again = prepare_workspace(dir.path()).unwrap();
        assert_eq!(workspace, again);
        assert_eq!(fs::read_to_string(again.readme_path()).unwrap(), "edited");
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let workspace = prepare_workspace(dir.path()).unwrap();
        let mode = fs::metadata(workspace.recordings_dir())
            .unwrap()
            .permissions()
            .mode();
        // umask can only clear bits
        assert_eq!(mode & 0o777 & !0o755, 0);
    }

    #[test]
    fn test_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "").unwrap();
        let err = prepare_workspace(&blocker).unwrap_err();
        assert_eq!(err.path, blocker.join("AtomeFiles"));
    }
}
