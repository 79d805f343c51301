//! Source acquisition: materialize a repository's working copy at a
//! key-derived path and remove it again afterwards.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to clear destination {path}: {source}")]
    Prepare {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("clone exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Clone-style acquisition of repository sources
#[async_trait]
pub trait SourceAcquisition: Send + Sync {
    /// Materialize `url` at `destination`, replacing anything already there
    async fn acquire(&self, url: &str, destination: &Path) -> Result<(), AcquisitionError>;

    /// Remove a working copy; succeeds if the path is already gone
    async fn release(&self, path: &Path) -> io::Result<()>;
}

/// Shallow `git clone` into the destination path
#[derive(Debug, Clone)]
pub struct GitAcquirer {
    git_binary: String,
}

impl Default for GitAcquirer {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitAcquirer {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }
}

#[async_trait]
impl SourceAcquisition for GitAcquirer {
    async fn acquire(&self, url: &str, destination: &Path) -> Result<(), AcquisitionError> {
        let prepare_error = |source| AcquisitionError::Prepare {
            path: destination.display().to_string(),
            source,
        };

        // Repeated attempts never build on a previous attempt's leftovers
        self.release(destination).await.map_err(prepare_error)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(prepare_error)?;
        }

        let output = Command::new(&self.git_binary)
            .arg("clone")
            .arg("--quiet")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| AcquisitionError::Spawn {
                binary: self.git_binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AcquisitionError::Exit {
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!(destination = %destination.display(), "Repository cloned");
        Ok(())
    }

    async fn release(&self, path: &Path) -> io::Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || release_path(&path))
            .await
            .map_err(io::Error::other)?
    }
}

/// Delete a directory tree, forcing entries writable when removal is denied.
///
/// Missing paths are not an error. A file or symlink at the path is removed
/// as-is.
pub fn release_path(path: &Path) -> io::Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if !metadata.is_dir() {
        return match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "Permission denied while removing, forcing writable");
            make_writable(path)?;
            fs::remove_dir_all(path)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    set_writable(path, metadata.permissions())?;
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_writable(path: &Path, mut permissions: fs::Permissions) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o700);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn set_writable(path: &Path, mut permissions: fs::Permissions) -> io::Result<()> {
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
