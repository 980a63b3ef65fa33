//! EXIF orientation lookup and correction.

use exif::{In, Reader, Tag};
use image::DynamicImage;
use std::io::Cursor;

/// Orientation encoded in EXIF tag 0x0112.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Normal,
    MirroredHorizontal,
    Rotate180,
    MirroredVertical,
    MirroredHorizontalAndRotate270,
    Rotate90,
    MirroredHorizontalAndRotate90,
    Rotate270,
}

impl Orientation {
    /// Read the orientation from the EXIF block of an encoded image.
    ///
    /// Missing or unreadable EXIF data yields [`Orientation::Normal`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::trace!(error = %e, "no usable EXIF block");
                return Self::Normal;
            }
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Self::from)
            .unwrap_or_default()
    }

    /// Rotate and/or mirror `img` so that it displays upright.
    #[must_use]
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::MirroredHorizontal => img.fliph(),
            Self::Rotate180 => img.rotate180(),
            Self::MirroredVertical => img.flipv(),
            Self::MirroredHorizontalAndRotate270 => img.fliph().rotate270(),
            Self::Rotate90 => img.rotate90(),
            Self::MirroredHorizontalAndRotate90 => img.fliph().rotate90(),
            Self::Rotate270 => img.rotate270(),
        }
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Self::MirroredHorizontal,
            3 => Self::Rotate180,
            4 => Self::MirroredVertical,
            5 => Self::MirroredHorizontalAndRotate270,
            6 => Self::Rotate90,
            7 => Self::MirroredHorizontalAndRotate90,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Encoded photos carrying an EXIF orientation tag.

    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, ImageEncoder, RgbImage};

    /// Big-endian TIFF block with a single IFD entry: Orientation (SHORT) = `value`.
    fn orientation_exif(value: u16) -> Vec<u8> {
        let mut exif = b"MM\0\x2a\0\0\0\x08".to_vec();
        exif.extend_from_slice(&1u16.to_be_bytes());
        exif.extend_from_slice(&0x0112u16.to_be_bytes());
        exif.extend_from_slice(&3u16.to_be_bytes());
        exif.extend_from_slice(&1u32.to_be_bytes());
        exif.extend_from_slice(&value.to_be_bytes());
        exif.extend_from_slice(&[0, 0]);
        exif.extend_from_slice(&0u32.to_be_bytes());
        exif
    }

    /// A `width` x `height` JPEG whose metadata asks for orientation `value`.
    pub fn jpeg_with_orientation(width: u32, height: u32, value: u16) -> Vec<u8> {
        let pixels = RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]));
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new(&mut out);
        encoder.set_exif_metadata(orientation_exif(value)).unwrap();
        encoder
            .write_image(pixels.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }
}
