//! File-based connector.
//!
//! Reads a resource's attributes from a JSON object on disk, e.g. a status
//! file an agent rewrites periodically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use fleetwatch_types::AttributeSnapshot;
use parking_lot::Mutex;
use tracing::trace;

use crate::{ConnectorError, ResourceConnector};

/// A connector that reads attributes from a JSON file.
///
/// The file must contain one JSON object mapping attribute names to
/// booleans, numbers or strings:
///
/// ```json
/// { "latency_ms": 420, "healthy": true, "state": "running" }
/// ```
///
/// The connector tracks the file's modification time and only re-parses
/// the file when it has been updated. A missing file means the resource is
/// unavailable.
#[derive(Debug)]
pub struct FileConnector {
    path: PathBuf,
    description: String,
    cache: Mutex<Option<(SystemTime, AttributeSnapshot)>>,
}

impl FileConnector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            cache: Mutex::new(None),
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cached(&self, modified: Option<SystemTime>) -> Option<AttributeSnapshot> {
        let modified = modified?;
        match &*self.cache.lock() {
            Some((at, snapshot)) if *at == modified => Some(snapshot.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl ResourceConnector for FileConnector {
    async fn sample(&self) -> Result<AttributeSnapshot, ConnectorError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConnectorError::Unavailable(format!(
                    "{} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let modified = metadata.modified().ok();

        if let Some(snapshot) = self.cached(modified) {
            trace!(path = %self.path.display(), "File unchanged, reusing snapshot");
            return Ok(snapshot);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot: AttributeSnapshot = serde_json::from_str(&content)?;

        if let Some(modified) = modified {
            *self.cache.lock() = Some((modified, snapshot.clone()));
        }
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::AttributeValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn reads_attribute_object() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "latency_ms": 420, "healthy": true, "state": "running", "load": 0.5 }"#)
            .unwrap();
        file.flush().unwrap();

        let connector = FileConnector::new(file.path());
        let snapshot = connector.sample().await.unwrap();

        assert_eq!(snapshot["latency_ms"], AttributeValue::Int(420));
        assert_eq!(snapshot["healthy"], AttributeValue::Bool(true));
        assert_eq!(snapshot["state"], AttributeValue::from("running"));
        assert_eq!(snapshot["load"], AttributeValue::Float(0.5));
        assert!(connector.description().starts_with("file: "));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FileConnector::new(dir.path().join("nope.json"));
        assert!(matches!(
            connector.sample().await,
            Err(ConnectorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2, 3]").unwrap();
        file.flush().unwrap();

        let connector = FileConnector::new(file.path());
        assert!(matches!(connector.sample().await, Err(ConnectorError::Parse(_))));
    }

    #[tokio::test]
    async fn picks_up_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web-1.json");
        std::fs::write(&path, r#"{ "latency_ms": 100 }"#).unwrap();

        let connector = FileConnector::new(&path);
        assert_eq!(connector.sample().await.unwrap()["latency_ms"], AttributeValue::Int(100));

        // Ensure the modification time moves even on coarse-grained filesystems.
        let later = SystemTime::now() + std::time::Duration::from_secs(5);
        std::fs::write(&path, r#"{ "latency_ms": 2500 }"#).unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(connector.sample().await.unwrap()["latency_ms"], AttributeValue::Int(2500));
    }
}
