// THEORY:
// The `pipeline` module is the top-level API of the analysis engine. It wires the
// core modules into one call per slide:
//
//     bytes -> decoder -> Slide -> segmenter -> Mask -> density -> scorer -> record
//
// and a batch runner that feeds every successful record into a `BatchReport`.
// Which scoring curve runs is fixed by the `PipelineConfig` handed to the
// constructor, so two pipelines with different curves can live side by side.
//
// A slide that cannot be read or decoded is reported as an `ItemFailure` and the
// batch moves on; failures never reach the report and never shift its rows.

use crate::core_modules::decoder;
use crate::core_modules::density::{self, Density};
use crate::core_modules::histogram::OtsuThreshold;
use crate::core_modules::preview::{self, PreviewConfig};
use crate::core_modules::report::{AnalysisRecord, BatchReport};
use crate::core_modules::scorer::{Scorer, ScoringVariant};
use crate::core_modules::segmenter::Segmenter;
use crate::core_modules::slide::slide::Slide;
use crate::error::{ConfigError, DecodeError, InputError};
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the `AnalysisPipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The density-to-score curve.
    pub scoring: ScoringVariant,
    /// Whether each analysis carries a side-by-side preview image.
    pub render_previews: bool,
    pub preview: PreviewConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringVariant::default(),
            render_previews: true,
            preview: PreviewConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()
    }
}

/// Everything learned about one slide.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub record: AnalysisRecord,
    pub threshold: OtsuThreshold,
    pub tissue_pixels: usize,
    pub total_pixels: usize,
    /// Present when `PipelineConfig::render_previews` is set.
    pub preview: Option<RgbImage>,
}

pub type ProcessingResult = Result<ImageAnalysis, DecodeError>;

/// Where a batch item's bytes come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// One named item of a batch.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub filename: String,
    pub source: InputSource,
}

impl BatchInput {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            source: InputSource::Bytes(bytes),
        }
    }

    /// Names the item after the file's final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            filename,
            source: InputSource::File(path),
        }
    }

    /// Reads the item's bytes. File handles are closed before this returns.
    pub fn load(&self) -> Result<Vec<u8>, InputError> {
        match &self.source {
            InputSource::Bytes(bytes) => Ok(bytes.clone()),
            InputSource::File(path) => fs::read(path).map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// A batch item that produced no record.
#[derive(Debug)]
pub struct ItemFailure {
    pub filename: String,
    pub error: InputError,
}

/// Per-item result of a batch, in input order.
#[derive(Debug)]
pub enum ItemOutcome {
    Analysed(ImageAnalysis),
    Failed(ItemFailure),
}

/// The result of a whole batch: the report of successes and the failures.
#[derive(Debug)]
pub struct BatchOutcome {
    pub report: BatchReport,
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    pub fn new(report: BatchReport) -> Self {
        Self {
            report,
            failures: Vec::new(),
        }
    }

    /// Folds one item into the outcome. Must be called in input order.
    pub fn absorb(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Analysed(analysis) => self.report.append(analysis.record),
            ItemOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

/// The main, top-level struct for the analysis engine.
pub struct AnalysisPipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    scorer: Box<dyn Scorer>,
}

impl AnalysisPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scorer = config.scoring.build();
        info!(
            "analysis pipeline ready: scorer={} precision={}",
            scorer.name(),
            scorer.precision()
        );
        Ok(Self {
            config,
            segmenter: Segmenter::new(),
            scorer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    /// An empty report that exports scores at this pipeline's precision.
    pub fn new_report(&self) -> BatchReport {
        BatchReport::new(self.scorer.precision())
    }

    /// Decodes and analyses one slide.
    pub fn process(&self, filename: &str, bytes: &[u8]) -> ProcessingResult {
        let slide = decoder::decode(bytes)?;
        Ok(self.analyse_slide(filename, &slide))
    }

    pub fn analyse_slide(&self, filename: &str, slide: &Slide) -> ImageAnalysis {
        let segmentation = self.segmenter.segment_with_threshold(slide);
        let density: Density = density::density(&segmentation.mask);
        let score = self.scorer.score(density);
        debug!(
            "{filename}: threshold={} density={density} score={}",
            segmentation.threshold.level,
            score.display_with(self.scorer.precision())
        );

        let preview = self
            .config
            .render_previews
            .then(|| preview::compose(slide, &segmentation.mask, &self.config.preview));

        ImageAnalysis {
            tissue_pixels: segmentation.mask.tissue_count(),
            total_pixels: segmentation.mask.len(),
            threshold: segmentation.threshold,
            record: AnalysisRecord {
                filename: filename.to_string(),
                density,
                score,
            },
            preview,
        }
    }

    /// Loads and analyses one batch item, turning every failure into an `ItemFailure`.
    pub fn process_input(&self, input: &BatchInput) -> ItemOutcome {
        let result = input
            .load()
            .and_then(|bytes| self.process(&input.filename, &bytes).map_err(InputError::from));
        match result {
            Ok(analysis) => ItemOutcome::Analysed(analysis),
            Err(error) => {
                warn!("skipping {}: {error}", input.filename);
                ItemOutcome::Failed(ItemFailure {
                    filename: input.filename.clone(),
                    error,
                })
            }
        }
    }

    /// Processes `inputs` one after another. `observe` sees every item outcome,
    /// previews included, before it is folded into the report.
    pub fn run_batch<I, F>(&self, inputs: I, mut observe: F) -> BatchOutcome
    where
        I: IntoIterator<Item = BatchInput>,
        F: FnMut(&ItemOutcome),
    {
        let mut outcome = BatchOutcome::new(self.new_report());
        for input in inputs {
            let item = self.process_input(&input);
            observe(&item);
            outcome.absorb(item);
        }
        info!(
            "batch complete: {} analysed, {} skipped",
            outcome.report.len(),
            outcome.failures.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::scorer::CustomRangeScorer;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_with_dark_pixels(dark: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(10, 10, |x, y| {
            if y * 10 + x < dark {
                Rgb([3, 3, 3])
            } else {
                Rgb([252, 252, 252])
            }
        });
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn custom_config() -> PipelineConfig {
        PipelineConfig {
            scoring: ScoringVariant::CustomRange(CustomRangeScorer::default()),
            ..Default::default()
        }
    }

    #[test]
    fn process_reports_density_and_score() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default()).unwrap();
        let analysis = pipeline.process("a.png", &png_with_dark_pixels(4)).unwrap();
        assert_eq!(analysis.tissue_pixels, 4);
        assert_eq!(analysis.total_pixels, 100);
        assert_eq!(analysis.record.density.percent(), 4.0);
        assert_eq!(analysis.record.score.value(), 0.0);
        assert_eq!(analysis.preview.map(|p| p.dimensions()), Some((20, 10)));
    }

    #[test]
    fn previews_can_be_disabled() {
        let config = PipelineConfig {
            render_previews: false,
            ..custom_config()
        };
        let pipeline = AnalysisPipeline::new(config).unwrap();
        let analysis = pipeline.process("a.png", &png_with_dark_pixels(4)).unwrap();
        assert!(analysis.preview.is_none());
        assert_eq!(analysis.record.score.value(), 0.1);
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default()).unwrap();
        assert!(matches!(
            pipeline.process("b.png", b"\x89PNG truncated"),
            Err(DecodeError::Undecodable(_))
        ));
    }

    #[test]
    fn batch_skips_failures_without_shifting_rows() {
        let pipeline = AnalysisPipeline::new(custom_config()).unwrap();
        let inputs = vec![
            BatchInput::from_bytes("a.png", png_with_dark_pixels(4)),
            BatchInput::from_bytes("b.png", b"garbage".to_vec()),
            BatchInput::from_bytes("c.png", png_with_dark_pixels(40)),
        ];
        let mut seen = Vec::new();
        let outcome = pipeline.run_batch(inputs, |item| {
            seen.push(matches!(item, ItemOutcome::Analysed(_)));
        });

        assert_eq!(seen, [true, false, true]);
        let rows = outcome.report.snapshot();
        let names: Vec<_> = rows.rows().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "c.png"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].filename, "b.png");
    }

    #[test]
    fn missing_file_is_a_read_failure() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default()).unwrap();
        let input = BatchInput::from_path("/nonexistent/dir/slide.tif");
        assert_eq!(input.filename, "slide.tif");
        match pipeline.process_input(&input) {
            ItemOutcome::Failed(failure) => {
                assert!(matches!(failure.error, InputError::Read { .. }))
            }
            ItemOutcome::Analysed(_) => panic!("missing file should not be analysed"),
        }
    }

    #[test]
    fn config_parses_and_validates() {
        let config = PipelineConfig::from_json_str(
            r#"{"scoring": {"variant": "custom-range", "lower": 30.0, "upper": 32.0},
                "render_previews": false}"#,
        )
        .unwrap();
        assert!(!config.render_previews);
        assert_eq!(config.preview, PreviewConfig::default());

        let invalid = PipelineConfig::from_json_str(
            r#"{"scoring": {"variant": "custom-range", "lower": 40.0, "upper": 32.0}}"#,
        );
        assert!(matches!(invalid, Err(ConfigError::Invalid(_))));
        assert!(matches!(
            PipelineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
