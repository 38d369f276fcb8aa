//! Catalog of export shapes offered to callers.
//!
//! The catalog is built from an immutable template; callers pick an
//! entry by mime type and adjust it through [`ExportCatalog::update`],
//! which swaps the stored spec for a rebuilt copy. The template itself
//! is regenerated on every construction so no catalog can leak edits
//! into another.

use lumo_common::ExportDefaults;

use crate::spec::{ExportSpec, Format, GifSpec, ImageSpec, VideoSpec};

fn template(defaults: &ExportDefaults) -> Vec<ExportSpec> {
    vec![
        ExportSpec::Video(VideoSpec {
            format: Format::new("mp4 (MJPEG)", "video/mp4", "mp4"),
            width: None,
            height: None,
            fps: defaults.video_fps,
            codec: defaults.video_codec.clone(),
            duration_secs: defaults.video_duration_secs,
        }),
        ExportSpec::Gif(GifSpec {
            format: Format::new("gif", "image/gif", "gif"),
            width: None,
            height: None,
            fps: defaults.gif_fps,
        }),
        ExportSpec::Image(ImageSpec {
            format: Format::new("png", "image/png", "png"),
            width: None,
            height: None,
            quality: None,
        }),
        ExportSpec::Image(ImageSpec {
            format: Format::new("jpeg", "image/jpeg", "jpg"),
            width: None,
            height: None,
            quality: Some(defaults.jpeg_quality),
        }),
    ]
}

/// Mutable working set of export specs, keyed by mime type.
#[derive(Debug, Clone)]
pub struct ExportCatalog {
    entries: Vec<ExportSpec>,
}

impl ExportCatalog {
    /// Catalog seeded from the stock defaults.
    pub fn standard() -> Self {
        Self::from_defaults(&ExportDefaults::default())
    }

    /// Catalog seeded from configured defaults.
    pub fn from_defaults(defaults: &ExportDefaults) -> Self {
        Self {
            entries: template(defaults),
        }
    }

    pub fn entries(&self) -> &[ExportSpec] {
        &self.entries
    }

    /// Looks up the entry whose format carries `mime`.
    pub fn select(&self, mime: &str) -> Option<&ExportSpec> {
        self.entries.iter().find(|spec| spec.mime() == mime)
    }

    /// Rebuilds the entry for `mime` through `edit` and stores the
    /// result. Returns false when no entry matches.
    pub fn update(&mut self, mime: &str, edit: impl FnOnce(&ExportSpec) -> ExportSpec) -> bool {
        match self.entries.iter_mut().find(|spec| spec.mime() == mime) {
            Some(slot) => {
                *slot = edit(slot);
                true
            }
            None => false,
        }
    }
}

impl Default for ExportCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_lists_all_four_shapes() {
        let catalog = ExportCatalog::standard();
        let mimes: Vec<&str> = catalog.entries().iter().map(|s| s.mime()).collect();
        assert_eq!(mimes, ["video/mp4", "image/gif", "image/png", "image/jpeg"]);
    }

    #[test]
    fn video_entry_carries_configured_defaults() {
        let catalog = ExportCatalog::standard();
        let Some(ExportSpec::Video(video)) = catalog.select("video/mp4") else {
            panic!("missing video entry");
        };
        assert_eq!(video.fps, 25);
        assert_eq!(video.codec, "mjpeg");
        assert_eq!(video.duration_secs, 1.0);
    }

    #[test]
    fn update_swaps_only_the_matching_entry() {
        let mut catalog = ExportCatalog::standard();
        assert!(catalog.update("image/jpeg", |spec| spec.with_quality(0.42)));
        assert_eq!(catalog.select("image/jpeg").unwrap().quality(), Some(0.42));
        assert_eq!(catalog.select("image/png").unwrap().quality(), None);
    }

    #[test]
    fn update_unknown_mime_reports_false() {
        let mut catalog = ExportCatalog::standard();
        assert!(!catalog.update("video/webm", |spec| spec.clone()));
    }

    #[test]
    fn catalogs_do_not_share_edits() {
        let mut first = ExportCatalog::standard();
        first.update("image/jpeg", |spec| spec.with_quality(0.1));
        let second = ExportCatalog::standard();
        assert_eq!(second.select("image/jpeg").unwrap().quality(), Some(0.95));
    }
}
