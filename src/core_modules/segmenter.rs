// THEORY:
// The segmenter turns a `Slide` into a binary tissue map. It is a pure function:
// luminance plane -> histogram -> Otsu cut -> labels. Labelling is inverse binary,
// because in stained sections the dense, dark regions are the tissue and the bright
// regions are glass and empty alveolar space.

use crate::core_modules::histogram::{LuminanceHistogram, OtsuThreshold};
use crate::core_modules::pixel::pixel::Luminance;
use crate::core_modules::slide::slide::Slide;
use log::debug;

/// Per-pixel class assigned by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Tissue,
    Background,
}

/// A binary label grid with the same extent as the slide it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    labels: Vec<Label>,
}

impl Mask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, x: u32, y: u32) -> Option<Label> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.labels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Number of cells. Never zero, since masks only come from non-empty slides.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn tissue_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|label| **label == Label::Tissue)
            .count()
    }
}

/// A mask together with the cut that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub threshold: OtsuThreshold,
    pub mask: Mask,
}

/// Global Otsu segmenter with inverse binary labelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    pub fn segment(&self, slide: &Slide) -> Mask {
        self.segment_with_threshold(slide).mask
    }

    pub fn segment_with_threshold(&self, slide: &Slide) -> Segmentation {
        let histogram = LuminanceHistogram::from_levels(slide.luminance_plane());
        let threshold = histogram.otsu_threshold();
        debug!(
            "otsu threshold {} (between-class variance {:.3}) over {} pixels",
            threshold.level,
            threshold.between_class_variance,
            histogram.total()
        );

        let labels = slide
            .luminance_plane()
            .map(|level| classify(level, threshold.level))
            .collect();

        Segmentation {
            threshold,
            mask: Mask {
                width: slide.width(),
                height: slide.height(),
                labels,
            },
        }
    }
}

fn classify(level: Luminance, threshold: Luminance) -> Label {
    if level < threshold {
        Label::Tissue
    } else {
        Label::Background
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn slide_from_levels(width: u32, height: u32, levels: &[u8]) -> Slide {
        let pixels = levels.iter().map(|&level| Pixel::gray(level)).collect();
        Slide::new(width, height, pixels).unwrap()
    }

    #[test]
    fn dark_pixels_become_tissue() {
        let slide = slide_from_levels(4, 1, &[5, 250, 10, 245]);
        let mask = Segmenter::new().segment(&slide);
        assert_eq!(
            mask.labels(),
            &[
                Label::Tissue,
                Label::Background,
                Label::Tissue,
                Label::Background
            ]
        );
        assert_eq!(mask.tissue_count(), 2);
    }

    #[test]
    fn mask_keeps_slide_extent() {
        let slide = slide_from_levels(3, 2, &[0, 50, 100, 150, 200, 250]);
        let mask = Segmenter::new().segment(&slide);
        assert_eq!((mask.width(), mask.height()), (3, 2));
        assert_eq!(mask.len(), 6);
        assert_eq!(mask.label(2, 1), Some(Label::Background));
        assert_eq!(mask.label(3, 1), None);
    }

    #[test]
    fn uniform_grey_slide_is_all_background() {
        let slide = slide_from_levels(2, 2, &[90; 4]);
        let segmentation = Segmenter::new().segment_with_threshold(&slide);
        assert_eq!(segmentation.threshold.level, 1);
        assert_eq!(segmentation.mask.tissue_count(), 0);
    }

    #[test]
    fn all_black_slide_is_all_tissue() {
        let slide = slide_from_levels(4, 4, &[0; 16]);
        let segmentation = Segmenter::new().segment_with_threshold(&slide);
        assert_eq!(segmentation.threshold.level, 1);
        assert_eq!(segmentation.mask.tissue_count(), 16);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let levels: Vec<u8> = (0..64u32).map(|i| ((i * 37) % 256) as u8).collect();
        let slide = slide_from_levels(8, 8, &levels);
        let first = Segmenter::new().segment_with_threshold(&slide);
        let second = Segmenter::new().segment_with_threshold(&slide);
        assert_eq!(first, second);
    }
}
