//! Remote scanning: find candidate video files, skip what's already
//! handled, and debounce in-progress uploads by size stability.

use std::sync::Arc;

use chrono::Utc;

use reelvault_model::{FileRef, ScannedFile};

use crate::config::Config;
use crate::error::Result;
use crate::filename_parser::FilenameParser;
use crate::store::Store;
use crate::transfer::FileTransfer;

pub struct Scanner {
    config: Arc<Config>,
    transfer: Arc<dyn FileTransfer>,
    store: Store,
    parser: FilenameParser,
}

impl Scanner {
    pub fn new(
        config: Arc<Config>,
        transfer: Arc<dyn FileTransfer>,
        store: Store,
        parser: FilenameParser,
    ) -> Self {
        Self {
            config,
            transfer,
            store,
            parser,
        }
    }

    /// Scan every configured remote and return the files that are
    /// ready for the pipeline: video, not yet handled, outside the
    /// destination trees, and size-stable.
    pub async fn scan_all(&self) -> Result<Vec<ScannedFile>> {
        let mut ready = Vec::new();
        for remote in &self.config.scan.remotes {
            match self.scan_remote(&remote.name).await {
                Ok(mut files) => ready.append(&mut files),
                Err(e) => {
                    tracing::error!(remote = %remote.name, error = %e, "scan failed");
                }
            }
        }
        Ok(ready)
    }

    pub async fn scan_remote(&self, remote: &str) -> Result<Vec<ScannedFile>> {
        if !self.transfer.is_remote_available(remote).await {
            tracing::warn!(remote, "remote unavailable, skipping scan");
            return Ok(Vec::new());
        }

        let entries = self.transfer.list(remote).await?;
        let stability_window = self.config.scan.stability_check_seconds as i64;
        let mut ready = Vec::new();
        let mut pending = 0usize;

        for entry in entries {
            if entry.is_dir || !self.parser.is_video_file(&entry.name) {
                continue;
            }
            // Files already filed under a destination root are organized
            // output, not input.
            if self.in_destination(&entry.path) {
                continue;
            }
            if self.store.is_processed(remote, &entry.path).await? {
                continue;
            }

            let last_change = self
                .store
                .observe_file(remote, &entry.path, entry.size)
                .await?;
            let is_stable = (Utc::now() - last_change).num_seconds() >= stability_window;

            if is_stable {
                ready.push(ScannedFile {
                    file: FileRef::new(remote, entry.path),
                    name: entry.name,
                    size: entry.size,
                    is_stable,
                });
            } else {
                pending += 1;
                tracing::debug!(remote, path = %entry.path, "upload still settling");
            }
        }

        tracing::info!(remote, ready = ready.len(), pending, "scan complete");
        Ok(ready)
    }

    fn in_destination(&self, path: &str) -> bool {
        let roots = [
            self.config.destinations.movie.as_str(),
            self.config.destinations.tvshow.as_str(),
            self.config.destinations.anime.as_str(),
            self.config.destinations.kdrama.as_str(),
        ];
        roots
            .iter()
            .any(|root| path == *root || path.starts_with(&format!("{root}/")))
    }
}
