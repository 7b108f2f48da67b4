// THEORY:
// The `Slide` module represents one decoded microscopy image: a rectangular,
// row-major grid of `Pixel`s. Like `Pixel`, it is a "dumb" data container. It knows
// its own extent and how to project itself into the luminance plane, but it does not
// know how to segment itself.
//
// A `Slide` can only be built with a non-zero extent and a pixel count that matches
// it. Every later stage (mask, density) relies on that to stay total.

pub mod slide {
    use crate::core_modules::pixel::pixel::{Luminance, Pixel};
    use image::RgbImage;

    /// Reasons a pixel grid cannot become a `Slide`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SlideShapeError {
        /// One of the dimensions is zero.
        Empty { width: u32, height: u32 },
        /// The pixel buffer does not hold `width * height` entries.
        LengthMismatch { expected: usize, actual: usize },
    }

    /// A decoded RGB image with at least one pixel.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Slide {
        width: u32,
        height: u32,
        pixels: Vec<Pixel>,
    }

    impl Slide {
        pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self, SlideShapeError> {
            if width == 0 || height == 0 {
                return Err(SlideShapeError::Empty { width, height });
            }
            let expected = width as usize * height as usize;
            if pixels.len() != expected {
                return Err(SlideShapeError::LengthMismatch {
                    expected,
                    actual: pixels.len(),
                });
            }
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        /// Builds a slide from an `image` crate RGB buffer.
        pub fn from_rgb_image(image: &RgbImage) -> Result<Self, SlideShapeError> {
            let pixels = image.pixels().map(|rgb| Pixel::from(*rgb)).collect();
            Self::new(image.width(), image.height(), pixels)
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        /// Total number of pixels. Never zero.
        pub fn len(&self) -> usize {
            self.pixels.len()
        }

        pub fn is_empty(&self) -> bool {
            self.pixels.is_empty()
        }

        pub fn pixels(&self) -> &[Pixel] {
            &self.pixels
        }

        pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels
                .get(y as usize * self.width as usize + x as usize)
                .copied()
        }

        /// Luminance of every pixel, in the same row-major order.
        pub fn luminance_plane(&self) -> impl Iterator<Item = Luminance> + '_ {
            self.pixels.iter().map(Pixel::luminance)
        }

        pub fn to_rgb_image(&self) -> RgbImage {
            RgbImage::from_fn(self.width, self.height, |x, y| {
                let index = y as usize * self.width as usize + x as usize;
                self.pixels[index].into()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::slide::*;
    use crate::core_modules::pixel::pixel::Pixel;

    #[test]
    fn rejects_zero_extent() {
        assert_eq!(
            Slide::new(0, 4, Vec::new()),
            Err(SlideShapeError::Empty {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn rejects_short_buffers() {
        let err = Slide::new(2, 2, vec![Pixel::default(); 3]).unwrap_err();
        assert_eq!(
            err,
            SlideShapeError::LengthMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn round_trips_through_rgb_image() {
        let image = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let slide = Slide::from_rgb_image(&image).unwrap();
        assert_eq!(slide.len(), 6);
        assert_eq!(slide.pixel(2, 1), Some(Pixel::new(2, 1, 7)));
        assert_eq!(slide.pixel(3, 0), None);
        assert_eq!(slide.to_rgb_image(), image);
    }
}
