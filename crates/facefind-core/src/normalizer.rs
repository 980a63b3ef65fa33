//! Photo normalization ahead of face detection.
//!
//! A source photo is decoded, turned upright, rejected when its shorter side
//! is under `min_side`, and otherwise resampled so that its pixel area equals
//! `max_area` while keeping the aspect ratio. The result is written to
//! scratch storage and the inverse scale factor is kept so detections on the
//! normalized raster can be mapped back onto the source.

use crate::raster::Raster;
use crate::scratch::{ScratchDir, ScratchStorage};
use image::ImageFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ratio reported while no resize has happened (skipped images).
pub const UNSET_RATIO: f64 = -1.0;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("image is not valid, probably cannot be loaded: {0}")]
    Load(String),
    #[error("image resize failed: {0}")]
    Resize(String),
    #[error("cannot store normalized image: {0}")]
    Save(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Limits applied to every photo handed to the normalizer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// MIME type of the encoding used for the scratch copy.
    pub encoding: String,
    /// Target pixel area of the normalized raster.
    pub max_area: u64,
    /// Photos whose shorter side is below this are skipped.
    pub min_side: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            encoding: "image/jpeg".to_string(),
            max_area: 1920 * 1080,
            min_side: 512,
        }
    }
}

/// Map a MIME type such as `image/png` onto an encoder format.
pub fn encoding_from_mime(mime: &str) -> Option<ImageFormat> {
    ImageFormat::from_mime_type(mime.trim())
}

/// A photo normalized into scratch storage.
///
/// Scratch files live until [`clean`](Self::clean) is called; dropping the
/// normalizer leaves them in place.
pub struct ImageNormalizer<S: ScratchStorage = ScratchDir> {
    source_path: PathBuf,
    encoding: ImageFormat,
    max_area: u64,
    min_side: u32,
    scratch: S,
    temp_path: Option<PathBuf>,
    dimensions: Option<(u32, u32)>,
    ratio: f64,
    skipped: bool,
}

impl ImageNormalizer<ScratchDir> {
    /// Normalize `source_path` into the system temp directory.
    pub fn new(
        source_path: impl Into<PathBuf>,
        preferred_encoding: &str,
        max_area: u64,
        min_side: u32,
    ) -> Result<Self, NormalizeError> {
        Self::with_scratch(
            source_path,
            preferred_encoding,
            max_area,
            min_side,
            ScratchDir::default(),
        )
    }

    /// Normalize `source_path` with limits taken from `options`.
    pub fn with_options(
        source_path: impl Into<PathBuf>,
        options: &NormalizeOptions,
        scratch: ScratchDir,
    ) -> Result<Self, NormalizeError> {
        Self::with_scratch(
            source_path,
            &options.encoding,
            options.max_area,
            options.min_side,
            scratch,
        )
    }
}

impl<S: ScratchStorage> ImageNormalizer<S> {
    /// Normalize `source_path`, allocating the output from `scratch`.
    ///
    /// On failure every scratch file allocated along the way is released
    /// before the error is returned.
    pub fn with_scratch(
        source_path: impl Into<PathBuf>,
        preferred_encoding: &str,
        max_area: u64,
        min_side: u32,
        scratch: S,
    ) -> Result<Self, NormalizeError> {
        if max_area == 0 {
            return Err(NormalizeError::InvalidArgument(
                "max_area must be positive".into(),
            ));
        }
        let encoding = encoding_from_mime(preferred_encoding).ok_or_else(|| {
            NormalizeError::InvalidArgument(format!(
                "unsupported preferred encoding: {preferred_encoding}"
            ))
        })?;

        let mut normalizer = Self {
            source_path: source_path.into(),
            encoding,
            max_area,
            min_side,
            scratch,
            temp_path: None,
            dimensions: None,
            ratio: UNSET_RATIO,
            skipped: false,
        };

        if let Err(e) = normalizer.prepare() {
            normalizer.clean();
            return Err(e);
        }
        Ok(normalizer)
    }

    fn prepare(&mut self) -> Result<(), NormalizeError> {
        let mut raster = Raster::load(&self.source_path)
            .map_err(|e| NormalizeError::Load(e.to_string()))?;
        raster.fix_orientation();

        if !raster.is_valid() {
            return Err(NormalizeError::Load(format!(
                "{} has empty dimensions",
                self.source_path.display()
            )));
        }

        let (width, height) = (raster.width(), raster.height());
        if width.min(height) < self.min_side {
            tracing::debug!(
                path = %self.source_path.display(),
                width,
                height,
                min_side = self.min_side,
                "image below minimum side, skipping"
            );
            self.skipped = true;
            return Ok(());
        }

        let (new_width, new_height, scale) = target_dimensions(width, height, self.max_area)?;
        raster
            .resize(new_width, new_height)
            .map_err(|e| NormalizeError::Resize(format!("error during image resize: {e}")))?;
        self.ratio = 1.0 / scale;
        self.dimensions = Some((new_width, new_height));

        let suffix = self
            .encoding
            .extensions_str()
            .first()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let temp_path = self
            .scratch
            .allocate(&suffix)
            .map_err(|e| NormalizeError::Save(format!("cannot allocate scratch file: {e}")))?;
        raster
            .save(&temp_path, self.encoding)
            .map_err(|e| NormalizeError::Save(format!("{}: {e}", temp_path.display())))?;

        tracing::info!(
            source = %self.source_path.display(),
            temp = %temp_path.display(),
            width,
            height,
            new_width,
            new_height,
            ratio = self.ratio,
            "normalized image"
        );
        self.temp_path = Some(temp_path);
        Ok(())
    }

    /// Path of the normalized scratch copy; `None` when the photo was skipped.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Factor mapping normalized coordinates back to source coordinates.
    ///
    /// Equals [`UNSET_RATIO`] when the photo was skipped.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Width and height of the normalized raster.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Release every scratch file this normalizer allocated.
    ///
    /// Safe to call any number of times, including after a skip.
    pub fn clean(&mut self) {
        self.scratch.release_all();
        self.temp_path = None;
    }
}

/// Dimensions of a `width` x `height` raster rescaled to `max_area` pixels,
/// together with the scale factor applied.
pub fn target_dimensions(
    width: u32,
    height: u32,
    max_area: u64,
) -> Result<(u32, u32, f64), NormalizeError> {
    if width == 0 || height == 0 {
        return Err(NormalizeError::Resize(
            "image is having non-positive width or height, cannot continue".into(),
        ));
    }

    let area = width as f64 * height as f64;
    let scale = (max_area as f64 / area).sqrt();
    let new_width = (width as f64 * scale).round();
    let new_height = (height as f64 * scale).round();

    let representable = |v: f64| (1.0..=u32::MAX as f64).contains(&v);
    if !representable(new_width) || !representable(new_height) {
        return Err(NormalizeError::Resize(format!(
            "cannot scale {width}x{height} to an area of {max_area}"
        )));
    }
    Ok((new_width as u32, new_height as u32, scale))
}
