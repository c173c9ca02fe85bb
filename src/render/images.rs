//! Decoded pictures for image annotations and the size they are drawn at.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

use crate::document::{Document, Image};

use super::layout::Extent;

/// Decoded images keyed by their `src`.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, RgbaImage>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every local image `doc` references. Relative sources resolve
    /// against `base`. Remote sources are never fetched, and files that fail
    /// to open are logged and left out; both are drawn as placeholders.
    pub fn load(doc: &Document, base: &Path) -> Self {
        let mut store = Self::new();
        for annotation in doc.images() {
            let src = &annotation.src;
            if annotation.is_remote() {
                tracing::debug!(src = %src, "remote image is not fetched");
                continue;
            }
            if store.images.contains_key(src) {
                continue;
            }
            let path = base.join(src);
            match image::open(&path) {
                Ok(decoded) => store.insert(src.clone(), decoded.to_rgba8()),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to load image");
                }
            }
        }
        tracing::debug!(loaded = store.len(), referenced = doc.images().len(), "images loaded");
        store
    }

    pub fn insert(&mut self, src: impl Into<String>, image: RgbaImage) {
        self.images.insert(src.into(), image);
    }

    pub fn get(&self, src: &str) -> Option<&RgbaImage> {
        self.images.get(src)
    }

    /// Natural pixel size of a decoded image.
    pub fn natural_size(&self, src: &str) -> Option<(u32, u32)> {
        self.get(src)
            .map(RgbaImage::dimensions)
            .filter(|&(w, h)| w > 0 && h > 0)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Size `image` is drawn at, no side larger than `max`.
///
/// With a decoded picture the requested size is fitted to the picture's
/// aspect ratio: a missing side follows the ratio, no size at all means the
/// natural size. Without one only a fully specified `WxH` keeps its box.
pub fn display_size(image: &Image, natural: Option<(u32, u32)>, max: i32) -> Option<Extent> {
    let max = max.max(1) as f32;
    let Some((nw, nh)) = natural else {
        let (w, h) = (image.width?, image.height?);
        return Some(Extent::new(
            (w as f32).min(max) as i32,
            (h as f32).min(max) as i32,
        ));
    };
    let (nw, nh) = (nw as f32, nh as f32);
    let (target_w, target_h) = match (image.width, image.height) {
        (Some(w), Some(h)) => (w as f32, h as f32),
        (Some(w), None) => (w as f32, nh * w as f32 / nw),
        (None, Some(h)) => (nw * h as f32 / nh, h as f32),
        (None, None) => (nw, nh),
    };
    let fit = (target_w.min(max) / nw).min(target_h.min(max) / nh);
    let size = Extent::new((nw * fit) as i32, (nh * fit) as i32);
    (size.width > 0 && size.height > 0).then_some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(width: Option<u32>, height: Option<u32>) -> Image {
        Image {
            src: "a.png".to_string(),
            alt: String::new(),
            width,
            height,
            start: 0,
            end: 1,
        }
    }

    #[test]
    fn test_display_size_without_picture() {
        assert_eq!(
            display_size(&annotation(Some(64), Some(32)), None, 512),
            Some(Extent::new(64, 32))
        );
        assert_eq!(display_size(&annotation(Some(64), None), None, 512), None);
        assert_eq!(display_size(&annotation(None, None), None, 512), None);
        assert_eq!(
            display_size(&annotation(Some(900), Some(10)), None, 512),
            Some(Extent::new(512, 10))
        );
    }

    #[test]
    fn test_display_size_follows_aspect_ratio() {
        let natural = Some((200, 100));
        assert_eq!(
            display_size(&annotation(None, None), natural, 512),
            Some(Extent::new(200, 100))
        );
        assert_eq!(
            display_size(&annotation(Some(50), None), natural, 512),
            Some(Extent::new(50, 25))
        );
        assert_eq!(
            display_size(&annotation(None, Some(50)), natural, 512),
            Some(Extent::new(100, 50))
        );
        assert_eq!(
            display_size(&annotation(Some(100), Some(100)), natural, 512),
            Some(Extent::new(100, 50))
        );
        assert_eq!(
            display_size(&annotation(None, None), natural, 100),
            Some(Extent::new(100, 50))
        );
    }

    #[test]
    fn test_load_skips_remote_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(dir.path().join("red.png"))
            .unwrap();
        let doc = Document::parse("![](red.png) ![](gone.png) ![](https://x.io/a.png)").unwrap();

        let store = ImageStore::load(&doc, dir.path());
        assert_eq!(store.len(), 1);
        assert_eq!(store.natural_size("red.png"), Some((4, 2)));
        assert!(store.get("gone.png").is_none());
        assert!(store.get("https://x.io/a.png").is_none());
    }
}
