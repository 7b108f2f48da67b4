// THEORY:
// Side-by-side diagnostic preview: the decoded slide on the left, its mask on the
// right. Nothing downstream of the scorer reads it. Previews are written next to
// each other in one directory, so their file names keep the input's extension and
// `a.png` and `a.tif` never share a preview.

use crate::core_modules::segmenter::{Label, Mask};
use crate::core_modules::slide::slide::Slide;
use crate::error::ExportError;
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Colours used to paint the mask half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub tissue_color: [u8; 3],
    pub background_color: [u8; 3],
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tissue_color: [255, 255, 255],
            background_color: [0, 0, 0],
        }
    }
}

/// Renders a mask as an RGB image.
pub fn render_mask(mask: &Mask, config: &PreviewConfig) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        mask_color(mask.label(x, y), config)
    })
}

/// Composes a `2w x h` preview: original on the left, rendered mask on the right.
pub fn compose(slide: &Slide, mask: &Mask, config: &PreviewConfig) -> RgbImage {
    let width = slide.width();
    RgbImage::from_fn(width * 2, slide.height(), |x, y| {
        if x < width {
            slide.pixel(x, y).unwrap_or_default().into()
        } else {
            mask_color(mask.label(x - width, y), config)
        }
    })
}

fn mask_color(label: Option<Label>, config: &PreviewConfig) -> Rgb<u8> {
    match label {
        Some(Label::Tissue) => Rgb(config.tissue_color),
        _ => Rgb(config.background_color),
    }
}

/// Encodes a preview as PNG bytes.
pub fn encode_png(preview: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Cursor::new(Vec::new());
    preview.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Encodes a preview as PNG and writes it to `path`.
pub fn write_png(preview: &RgbImage, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_png(preview)?;
    fs::write(path, bytes).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Preview file name for an input: `lung_01.tif` becomes `lung_01_tif_preview.png`.
pub fn preview_file_name(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    match path.extension() {
        Some(ext) => format!("{stem}_{}_preview.png", ext.to_string_lossy()),
        None => format!("{stem}_preview.png"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::core_modules::segmenter::Segmenter;

    fn two_tone_slide() -> Slide {
        let pixels = vec![
            Pixel::new(10, 20, 30),
            Pixel::gray(240),
            Pixel::gray(235),
            Pixel::new(5, 5, 5),
        ];
        Slide::new(2, 2, pixels).unwrap()
    }

    #[test]
    fn preview_is_twice_as_wide() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let preview = compose(&slide, &mask, &PreviewConfig::default());
        assert_eq!(preview.dimensions(), (4, 2));
    }

    #[test]
    fn left_half_is_original_right_half_is_mask() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let preview = compose(&slide, &mask, &PreviewConfig::default());

        assert_eq!(preview.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(preview.get_pixel(1, 0).0, [240, 240, 240]);
        assert_eq!(preview.get_pixel(2, 0).0, [255, 255, 255]);
        assert_eq!(preview.get_pixel(3, 0).0, [0, 0, 0]);
        assert_eq!(preview.get_pixel(3, 1).0, [255, 255, 255]);
    }

    #[test]
    fn custom_colours_are_used() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let config = PreviewConfig {
            tissue_color: [200, 0, 0],
            background_color: [0, 0, 90],
        };
        let rendered = render_mask(&mask, &config);
        assert_eq!(rendered.get_pixel(0, 0).0, [200, 0, 0]);
        assert_eq!(rendered.get_pixel(1, 0).0, [0, 0, 90]);
    }

    #[test]
    fn preview_names_keep_the_extension() {
        assert_eq!(preview_file_name("a.png"), "a_png_preview.png");
        assert_eq!(preview_file_name("a.tif"), "a_tif_preview.png");
        assert_eq!(preview_file_name("slide"), "slide_preview.png");
        assert_ne!(preview_file_name("a.png"), preview_file_name("a.tif"));
    }

    #[test]
    fn writes_png_to_disk() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let path = std::env::temp_dir().join(format!(
            "fibro_vision_preview_{}.png",
            std::process::id()
        ));
        write_png(&compose(&slide, &mask, &PreviewConfig::default()), &path).unwrap();

        let written = image::open(&path).unwrap().into_rgb8();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(written.dimensions(), (4, 2));
        assert_eq!(written.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn write_failure_names_the_path() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let path = std::env::temp_dir()
            .join("fibro_vision_missing_dir")
            .join("nested")
            .join("preview.png");
        let err = write_png(&compose(&slide, &mask, &PreviewConfig::default()), &path)
            .unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
        assert!(err.to_string().contains("preview.png"));
    }

    #[test]
    fn encodes_as_png() {
        let slide = two_tone_slide();
        let mask = Segmenter::new().segment(&slide);
        let bytes = encode_png(&compose(&slide, &mask, &PreviewConfig::default())).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
