//! Delivery of finished export blobs.
//!
//! The pipeline hands a [`Blob`] and a suggested filename to a sink and
//! moves on; delivery is fire and forget, so sinks report failures
//! through their own logging rather than back to the pipeline.

use std::path::{Path, PathBuf};

use lumo_common::AppConfig;
use tracing::{error, info};

use crate::spec::{Blob, ExportSpec};

/// Receives finished export blobs.
pub trait DownloadSink {
    fn download(&self, filename: &str, blob: &Blob);
}

/// Writes blobs into a downloads directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sink rooted at the configured exports directory.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.exports_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn download(&self, filename: &str, blob: &Blob) {
        let path = self.dir.join(filename);
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            error!(dir = %self.dir.display(), error = %e, "could not create sink directory");
            return;
        }
        match std::fs::write(&path, &blob.bytes) {
            Ok(()) => info!(path = %path.display(), bytes = blob.len(), "export delivered"),
            Err(e) => error!(path = %path.display(), error = %e, "export delivery failed"),
        }
    }
}

/// Default download name for a spec: videos are offered as `video.*`,
/// stills and GIFs as `image.*`.
pub fn suggested_filename(spec: &ExportSpec) -> String {
    let stem = match spec {
        ExportSpec::Video(_) => "video",
        ExportSpec::Image(_) | ExportSpec::Gif(_) => "image",
    };
    format!("{stem}.{}", spec.format().extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExportCatalog;

    #[test]
    fn filenames_follow_the_spec_shape() {
        let catalog = ExportCatalog::standard();
        let names: Vec<String> = catalog.entries().iter().map(suggested_filename).collect();
        assert_eq!(names, ["video.mp4", "image.gif", "image.png", "image.jpg"]);
    }

    #[test]
    fn directory_sink_roots_at_the_configured_exports_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.exports_dir = dir.path().join("exports");

        let sink = DirectorySink::from_config(&config);
        assert_eq!(sink.dir(), config.exports_dir.as_path());
    }

    #[test]
    fn directory_sink_writes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let blob = Blob::new(vec![1, 2, 3], "image/png");

        sink.download("image.png", &blob);

        let written = std::fs::read(dir.path().join("image.png")).unwrap();
        assert_eq!(written, blob.bytes);
    }

    #[test]
    fn directory_sink_swallows_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"occupied").unwrap();
        let sink = DirectorySink::new(&file);

        // Target directory is actually a file; delivery must not panic.
        sink.download("image.png", &Blob::new(vec![9], "image/png"));
    }
}
