//! Owned raster handle used by the normalizer.
//!
//! Wraps an `image::DynamicImage` and exposes only what normalization needs:
//! load, orientation fix, validity check, resize and save.

use crate::orientation::Orientation;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Resampling filter for downscaling photos ahead of face detection.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("cannot guess image format: {0}")]
    Format(std::io::Error),
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// A decoded image together with the orientation recorded in its metadata.
pub struct Raster {
    image: DynamicImage,
    orientation: Orientation,
}

impl Raster {
    /// Read and decode the file at `path`.
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let bytes = std::fs::read(path).map_err(|source| RasterError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Decode an in-memory encoded image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RasterError> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(RasterError::Format)?
            .decode()?;

        Ok(Self {
            image,
            orientation: Orientation::from_bytes(bytes),
        })
    }

    /// Apply the recorded orientation so the pixels are upright.
    ///
    /// The orientation is consumed: calling this twice rotates only once.
    pub fn fix_orientation(&mut self) {
        let orientation = std::mem::take(&mut self.orientation);
        if orientation != Orientation::Normal {
            tracing::debug!(?orientation, "applying EXIF orientation");
            let image = std::mem::replace(&mut self.image, DynamicImage::new_luma8(0, 0));
            self.image = orientation.apply(image);
        }
    }

    /// A raster is usable when both dimensions are non-zero.
    pub fn is_valid(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resample to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }
        self.image = self.image.resize_exact(width, height, RESIZE_FILTER);
        Ok(())
    }

    /// Encode into `path` using `format`.
    ///
    /// JPEG has no alpha channel, so those rasters are flattened to RGB first.
    pub fn save(&self, path: &Path, format: ImageFormat) -> Result<(), RasterError> {
        match (format, &self.image) {
            (ImageFormat::Jpeg, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => {
                self.image.save_with_format(path, format)?
            }
            (ImageFormat::Jpeg, other) => {
                DynamicImage::ImageRgb8(other.to_rgb8()).save_with_format(path, format)?
            }
            _ => self.image.save_with_format(path, format)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_from_bytes_decodes_dimensions() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(30, 20)));
        let raster = Raster::from_bytes(&bytes).unwrap();
        assert!(raster.is_valid());
        assert_eq!((raster.width(), raster.height()), (30, 20));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(Raster::from_bytes(b"definitely not a picture").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Raster::load(Path::new("/nonexistent/facefind/photo.jpg")).err().unwrap();
        assert!(matches!(err, RasterError::Read { .. }));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let mut raster = Raster::from_bytes(&bytes).unwrap();
        assert!(matches!(
            raster.resize(0, 4),
            Err(RasterError::InvalidSize { width: 0, height: 4 })
        ));
        raster.resize(2, 3).unwrap();
        assert_eq!((raster.width(), raster.height()), (2, 3));
    }

    #[test]
    fn test_save_rgba_as_jpeg() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.jpg");
        let bytes = png_bytes(DynamicImage::ImageRgba8(RgbaImage::new(8, 8)));
        let raster = Raster::from_bytes(&bytes).unwrap();

        raster.save(&path, ImageFormat::Jpeg).unwrap();
        let reloaded = Raster::load(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (8, 8));
    }
}
