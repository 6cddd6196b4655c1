// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staging of the enhanced image for recognition.
//
// External recognizers read from a file, so the enhanced pixels are written
// to a uniquely named PNG in the scratch directory. The file lives exactly as
// long as the `EnhancedImage` that owns it.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use docscan_core::error::{DocscanError, Result};

const FILE_PREFIX: &str = "document_scan_";
const FILE_SUFFIX: &str = ".png";

/// An enhanced image together with its on-disk copy.
///
/// Passed by value from the enhancement step to the recognition step and then
/// consumed by [`discard`](Self::discard). If it is dropped instead (early
/// return, unwinding), the backing file is still removed.
#[derive(Debug)]
pub struct EnhancedImage {
    image: DynamicImage,
    file: NamedTempFile,
}

impl EnhancedImage {
    /// Write `image` as PNG to a fresh `document_scan_*.png` file in `dir`.
    pub fn stage(image: DynamicImage, dir: &Path) -> Result<Self> {
        let mut file = Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)?;

        image
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|e| DocscanError::Image(format!("failed to stage enhanced image: {e}")))?;

        debug!(
            path = %file.path().display(),
            width = image.width(),
            height = image.height(),
            "Enhanced image staged"
        );
        Ok(Self { image, file })
    }

    /// Location of the staged PNG.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The enhanced pixels.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Remove the staged file.
    ///
    /// Removal failures are logged and otherwise ignored.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "Staged image removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn sample() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 4, Luma([255])))
    }

    #[test]
    fn stage_writes_a_png_in_the_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let staged = EnhancedImage::stage(sample(), dir.path()).unwrap();

        let path = staged.path().to_path_buf();
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX), "{name}");

        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (8, 4));
        assert_eq!(staged.image().width(), 8);
    }

    #[test]
    fn discard_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = EnhancedImage::stage(sample(), dir.path()).unwrap();
        let path = staged.path().to_path_buf();

        staged.discard();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let staged = EnhancedImage::stage(sample(), dir.path()).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn discard_tolerates_an_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = EnhancedImage::stage(sample(), dir.path()).unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        staged.discard();
    }

    #[test]
    fn stage_into_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnhancedImage::stage(sample(), &dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DocscanError::Io(_)));
    }

    #[test]
    fn staged_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = EnhancedImage::stage(sample(), dir.path()).unwrap();
        let b = EnhancedImage::stage(sample(), dir.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
