//! Scanner behavior against a scripted remote listing.

use std::sync::Arc;

use async_trait::async_trait;

use reelvault_core::config::{Config, RemoteConfig};
use reelvault_core::transfer::{FileTransfer, TransferError};
use reelvault_core::{FilenameParser, Scanner, Store};
use reelvault_model::{ContentClass, FileRef, RemoteEntry};

struct ListingTransfer {
    entries: Vec<RemoteEntry>,
    available: bool,
}

fn entry(path: &str, size: i64, is_dir: bool) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size,
        is_dir,
        mod_time: String::new(),
    }
}

#[async_trait]
impl FileTransfer for ListingTransfer {
    async fn list(&self, _remote: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        Ok(self.entries.clone())
    }

    async fn move_file(&self, _s: &FileRef, _d: &FileRef) -> Result<(), TransferError> {
        Ok(())
    }

    async fn delete_file(&self, _f: &FileRef) -> Result<(), TransferError> {
        Ok(())
    }

    async fn exists(&self, _f: &FileRef) -> Result<bool, TransferError> {
        Ok(true)
    }

    async fn remove_empty_dirs(&self, _r: &str, _p: &str) -> Result<(), TransferError> {
        Ok(())
    }

    async fn is_remote_available(&self, _remote: &str) -> bool {
        self.available
    }
}

fn test_config() -> Arc<Config> {
    let mut config = Config::default();
    config.scan.remotes.push(RemoteConfig {
        name: "movies".to_string(),
        content: ContentClass::Movie,
    });
    // Newly observed files count as stable immediately.
    config.scan.stability_check_seconds = 0;
    Arc::new(config)
}

#[tokio::test]
async fn scan_yields_only_unhandled_video_files_outside_destinations() {
    let transfer = Arc::new(ListingTransfer {
        entries: vec![
            entry("incoming/Maa.2025.1080p.Hindi.WEB-DL.mkv", 1_000, false),
            entry("incoming/readme.txt", 10, false),
            entry("incoming/subfolder", 0, true),
            entry("Movies/Filed (2020)/Filed (2020) - 1080p.mkv", 2_000, false),
        ],
        available: true,
    });
    let store = Store::open_in_memory().await.unwrap();
    let scanner = Scanner::new(
        test_config(),
        transfer,
        store,
        FilenameParser::default(),
    );

    let ready = scanner.scan_all().await.unwrap();
    let paths: Vec<&str> = ready.iter().map(|f| f.file.path.as_str()).collect();
    assert_eq!(paths, vec!["incoming/Maa.2025.1080p.Hindi.WEB-DL.mkv"]);
    assert!(ready[0].is_stable);
}

#[tokio::test]
async fn settling_uploads_are_held_back() {
    let transfer = Arc::new(ListingTransfer {
        entries: vec![entry("incoming/upload.mkv", 500, false)],
        available: true,
    });
    let store = Store::open_in_memory().await.unwrap();
    let mut config = Config::default();
    config.scan.remotes.push(RemoteConfig {
        name: "movies".to_string(),
        content: ContentClass::Movie,
    });
    config.scan.stability_check_seconds = 3600;
    let scanner = Scanner::new(Arc::new(config), transfer, store, FilenameParser::default());

    let ready = scanner.scan_all().await.unwrap();
    assert!(ready.is_empty(), "a fresh file must wait out the window");
}

#[tokio::test]
async fn unavailable_remote_is_skipped_without_error() {
    let transfer = Arc::new(ListingTransfer {
        entries: vec![entry("incoming/a.mkv", 1, false)],
        available: false,
    });
    let store = Store::open_in_memory().await.unwrap();
    let scanner = Scanner::new(
        test_config(),
        transfer,
        store,
        FilenameParser::default(),
    );

    let ready = scanner.scan_all().await.unwrap();
    assert!(ready.is_empty());
}
