use serde::{Deserialize, Serialize};

/// Location of a file on a remote. The single descriptor type handed
/// between scanner, engine, and executor; batch callers construct it
/// uniformly instead of passing raw strings around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub remote: String,
    pub path: String,
}

impl FileRef {
    pub fn new(remote: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            path: path.into(),
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Name of the immediate parent folder, if there is one.
    pub fn parent_folder(&self) -> Option<&str> {
        let (parent, _) = self.path.rsplit_once('/')?;
        let name = parent.rsplit('/').next().unwrap_or(parent);
        (!name.is_empty()).then_some(name)
    }

    /// Parent directory path, if any, for empty-dir cleanup.
    pub fn parent_path(&self) -> Option<&str> {
        self.path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .filter(|p| !p.is_empty())
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.remote, self.path)
    }
}

/// One entry from a remote listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Size", default)]
    pub size: i64,
    #[serde(rename = "IsDir", default)]
    pub is_dir: bool,
    #[serde(rename = "ModTime", default)]
    pub mod_time: String,
}

/// A media file found during scanning, with its debounce state.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file: FileRef,
    pub name: String,
    pub size: i64,
    /// Size unchanged for the configured window: upload finished.
    pub is_stable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ref_components() {
        let f = FileRef::new("movies", "incoming/Some Movie/file.mkv");
        assert_eq!(f.file_name(), "file.mkv");
        assert_eq!(f.parent_folder(), Some("Some Movie"));
        assert_eq!(f.parent_path(), Some("incoming/Some Movie"));

        let root = FileRef::new("movies", "file.mkv");
        assert_eq!(root.file_name(), "file.mkv");
        assert_eq!(root.parent_folder(), None);
        assert_eq!(root.parent_path(), None);
    }
}
