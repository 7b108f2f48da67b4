// THEORY:
// The decoder is the boundary between opaque uploaded bytes and the pipeline. It
// sniffs the container format from the bytes themselves (JPEG, PNG, TIFF and the
// other formats the `image` crate recognises), converts whatever colour layout it
// finds to 8-bit RGB, and refuses anything that would give an empty `Slide`.

use crate::core_modules::slide::slide::{Slide, SlideShapeError};
use crate::error::DecodeError;
use log::debug;

/// File extensions the batch front end picks up when expanding directories.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Decodes raw bytes into a `Slide`.
pub fn decode(bytes: &[u8]) -> Result<Slide, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let decoded = image::load_from_memory(bytes)?;
    debug!(
        "decoded {}x{} image ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let rgb = decoded.into_rgb8();
    Slide::from_rgb_image(&rgb).map_err(|err| match err {
        SlideShapeError::Empty { width, height } => DecodeError::EmptyImage { width, height },
        // `into_rgb8` always yields a buffer matching its own extent.
        SlideShapeError::LengthMismatch { .. } => DecodeError::EmptyImage {
            width: rgb.width(),
            height: rgb.height(),
        },
    })
}

/// Whether a file name carries one of the supported extensions (case-insensitive).
pub fn is_supported_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).expect("encode test image");
        bytes.into_inner()
    }

    #[test]
    fn decodes_png_and_tiff() {
        let image = RgbImage::from_pixel(4, 3, image::Rgb([12, 34, 56]));
        for format in [ImageFormat::Png, ImageFormat::Tiff] {
            let slide = decode(&encode(&image, format)).unwrap();
            assert_eq!((slide.width(), slide.height()), (4, 3));
            assert_eq!(slide.pixel(0, 0), Some(Pixel::new(12, 34, 56)));
        }
    }

    #[test]
    fn decodes_jpeg() {
        let image = RgbImage::from_pixel(16, 16, image::Rgb([200, 200, 200]));
        let slide = decode(&encode(&image, ImageFormat::Jpeg)).unwrap();
        assert_eq!(slide.len(), 256);
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(decode(&[]), Err(DecodeError::EmptyPayload)));
    }

    #[test]
    fn garbage_is_undecodable() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result, Err(DecodeError::Undecodable(_))));
    }

    #[test]
    fn recognises_supported_extensions() {
        assert!(is_supported_file_name("section_01.TIF"));
        assert!(is_supported_file_name("a.b.jpeg"));
        assert!(!is_supported_file_name("notes.txt"));
        assert!(!is_supported_file_name("png"));
    }
}
