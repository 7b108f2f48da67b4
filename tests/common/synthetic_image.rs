use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// A `width x height` slide whose first `dark` pixels (row-major) are near-black and
/// the rest near-white.
pub fn two_tone(width: u32, height: u32, dark: u32) -> RgbImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    RgbImage::from_fn(width, height, |x, y| {
        if y * width + x < dark {
            Rgb([1, 2, 0])
        } else {
            Rgb([254, 255, 253])
        }
    })
}

/// Pink-and-purple pseudo H&E section: dense nuclei blobs on a pale background,
/// with a little deterministic texture in both classes.
pub fn stained_section(width: u32, height: u32, cell: u32) -> RgbImage {
    assert!(cell > 0, "cell size must be positive");
    RgbImage::from_fn(width, height, |x, y| {
        let texture = ((x * 7 + y * 13) % 11) as u8;
        let in_nucleus = (x / cell + y / cell) % 3 == 0;
        if in_nucleus {
            Rgb([70 + texture, 30 + texture, 110 + texture])
        } else {
            Rgb([235 - texture, 200 - texture, 225 - texture])
        }
    })
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .expect("failed to encode synthetic image");
    bytes.into_inner()
}

pub fn png(image: &RgbImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}
