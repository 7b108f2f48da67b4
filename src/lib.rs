// THEORY:
// This file is the entry point for the `fibro_vision` library crate. It exposes the
// `AnalysisPipeline` (one slide at a time, plus a sequential batch runner), the
// `ParallelPipeline` (the same batch semantics on a tokio worker pool) and the data
// structures they exchange: `PipelineConfig`, `AnalysisRecord`, `BatchReport` and
// `ReportTable`.
//
// The stages behind them live in `core_modules` and can be used on their own:
// `decoder` -> `segmenter` -> `density` -> `scorer`, with `preview` and `report`
// on the side.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use crate::core_modules::density::Density;
pub use crate::core_modules::report::{AnalysisRecord, BatchReport, ReportTable};
pub use crate::core_modules::scorer::{
    BiologicalRangeScorer, CustomRangeScorer, Score, Scorer, ScoringVariant,
};
pub use crate::error::{ConfigError, DecodeError, ExportError, InputError};
pub use crate::parallel_pipeline::ParallelPipeline;
pub use crate::pipeline::{
    AnalysisPipeline, BatchInput, BatchOutcome, ImageAnalysis, ItemOutcome, PipelineConfig,
    ProcessingResult,
};
