//! Remote file operations behind the `FileTransfer` trait.
//!
//! Production uses `RcloneTransfer`, which shells out to the rclone
//! binary; everything runs server-side on the remote so no media bytes
//! pass through this process. Tests substitute fakes for the trait.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use reelvault_model::{FileRef, RemoteEntry};

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("rclone is not available: {0}")]
    BinaryUnavailable(String),

    #[error("rclone {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("rclone {command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("could not parse rclone listing: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to run rclone: {0}")]
    Spawn(#[from] std::io::Error),
}

#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Recursive file listing of an entire remote.
    async fn list(&self, remote: &str) -> Result<Vec<RemoteEntry>, TransferError>;

    /// Server-side move; parent directories are created as needed.
    async fn move_file(&self, source: &FileRef, dest: &FileRef) -> Result<(), TransferError>;

    async fn delete_file(&self, file: &FileRef) -> Result<(), TransferError>;

    async fn exists(&self, file: &FileRef) -> Result<bool, TransferError>;

    /// Prune empty directories under `path`, keeping `path` itself.
    async fn remove_empty_dirs(&self, remote: &str, path: &str) -> Result<(), TransferError>;

    async fn is_remote_available(&self, remote: &str) -> bool;
}

/// `FileTransfer` implemented by shelling out to rclone.
#[derive(Debug, Clone)]
pub struct RcloneTransfer {
    binary: String,
    list_timeout: Duration,
    move_timeout: Duration,
    op_timeout: Duration,
}

impl Default for RcloneTransfer {
    fn default() -> Self {
        Self {
            binary: "rclone".to_string(),
            list_timeout: Duration::from_secs(120),
            // Server-side moves of large files can still take a while
            // when the backend falls back to copy+delete.
            move_timeout: Duration::from_secs(1800),
            op_timeout: Duration::from_secs(60),
        }
    }
}

impl RcloneTransfer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    /// Startup probe: confirms the binary exists and runs.
    pub async fn verify_binary(&self) -> Result<(), TransferError> {
        let output = self.run(&["version"], self.op_timeout).await?;
        let first_line = output.lines().next().unwrap_or("").to_string();
        tracing::info!(version = %first_line, "rclone available");
        Ok(())
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, TransferError> {
        let command = args.first().copied().unwrap_or("").to_string();
        tracing::debug!(%command, ?args, "running rclone");

        let result = tokio::time::timeout(
            timeout,
            Command::new(&self.binary).args(args).output(),
        )
        .await
        .map_err(|_| TransferError::Timeout {
            command: command.clone(),
            seconds: timeout.as_secs(),
        })?;

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::BinaryUnavailable(self.binary.clone())
            } else {
                TransferError::Spawn(e)
            }
        })?;

        if !output.status.success() {
            return Err(TransferError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn location(remote: &str, path: &str) -> String {
    format!("{remote}:{path}")
}

#[async_trait]
impl FileTransfer for RcloneTransfer {
    async fn list(&self, remote: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        let target = location(remote, "");
        let stdout = self
            .run(&["lsjson", "-R", "--files-only", target.as_str()], self.list_timeout)
            .await?;
        let entries: Vec<RemoteEntry> = serde_json::from_str(&stdout)?;
        tracing::debug!(remote, count = entries.len(), "listed remote");
        Ok(entries)
    }

    async fn move_file(&self, source: &FileRef, dest: &FileRef) -> Result<(), TransferError> {
        let from = location(&source.remote, &source.path);
        let to = location(&dest.remote, &dest.path);
        self.run(&["moveto", from.as_str(), to.as_str()], self.move_timeout).await?;
        tracing::info!(%source, dest = %dest, "moved file");
        Ok(())
    }

    async fn delete_file(&self, file: &FileRef) -> Result<(), TransferError> {
        let target = location(&file.remote, &file.path);
        self.run(&["deletefile", target.as_str()], self.op_timeout).await?;
        tracing::info!(%file, "deleted file");
        Ok(())
    }

    async fn exists(&self, file: &FileRef) -> Result<bool, TransferError> {
        let parent = file.parent_path().unwrap_or("");
        let target = location(&file.remote, parent);
        let stdout = self.run(&["lsf", "--files-only", target.as_str()], self.op_timeout).await?;
        let name = file.file_name();
        Ok(stdout.lines().any(|line| line.trim() == name))
    }

    async fn remove_empty_dirs(&self, remote: &str, path: &str) -> Result<(), TransferError> {
        let target = location(remote, path);
        self.run(&["rmdirs", "--leave-root", target.as_str()], self.op_timeout)
            .await?;
        Ok(())
    }

    async fn is_remote_available(&self, remote: &str) -> bool {
        let target = location(remote, "");
        match self
            .run(&["lsf", "--max-depth", "1", target.as_str()], self.op_timeout)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(remote, error = %e, "remote unavailable");
                false
            }
        }
    }
}
