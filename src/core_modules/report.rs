// THEORY:
// The report module is the batch aggregation layer. It turns a run over many slides
// into one table a pathologist can open in a spreadsheet.
//
// Key architectural principles:
// 1.  **Append-only history**: `BatchReport` owns the sequence of `AnalysisRecord`s.
//     Records are only ever pushed to the end; nothing is edited or removed, so the
//     row order is always the order in which slides finished processing.
// 2.  **Derived tables**: `ReportTable` is a snapshot, regenerated on request. Taking
//     a snapshot never changes the report.
// 3.  **Stable export**: the CSV column contract is `filename, density(%), score`.
//     Output starts with a UTF-8 byte-order mark so spreadsheet tools pick the right
//     encoding for non-ASCII file names, and the same table always yields the same
//     bytes.

use crate::core_modules::density::Density;
use crate::core_modules::scorer::Score;
use crate::error::ExportError;

pub const COLUMNS: [&str; 3] = ["filename", "density(%)", "score"];
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const MIME_TYPE: &str = "text/csv";
pub const DEFAULT_REPORT_FILE_NAME: &str = "pathology_report.csv";

/// The outcome of analysing one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub filename: String,
    pub density: Density,
    pub score: Score,
}

/// Append-only record of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    records: Vec<AnalysisRecord>,
    score_precision: u32,
}

impl BatchReport {
    /// `score_precision` is the number of decimals scores are exported with,
    /// normally `Scorer::precision` of the active scorer.
    pub fn new(score_precision: u32) -> Self {
        Self {
            records: Vec::new(),
            score_precision,
        }
    }

    pub fn append(&mut self, record: AnalysisRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn snapshot(&self) -> ReportTable {
        ReportTable {
            rows: self.records.clone(),
            score_precision: self.score_precision,
        }
    }
}

/// Aggregate figures over a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSummary {
    pub count: usize,
    pub mean_density: Option<f64>,
    pub mean_score: Option<f64>,
}

/// A point-in-time view of a `BatchReport`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    rows: Vec<AnalysisRecord>,
    score_precision: u32,
}

impl ReportTable {
    pub fn columns(&self) -> [&'static str; 3] {
        COLUMNS
    }

    pub fn rows(&self) -> &[AnalysisRecord] {
        &self.rows
    }

    pub fn suggested_filename(&self) -> &'static str {
        DEFAULT_REPORT_FILE_NAME
    }

    /// Cells of one row as they appear in the export.
    pub fn formatted_row(&self, record: &AnalysisRecord) -> [String; 3] {
        [
            record.filename.clone(),
            format!("{:?}", record.density.percent()),
            record.score.display_with(self.score_precision),
        ]
    }

    pub fn summary(&self) -> ReportSummary {
        let count = self.rows.len();
        if count == 0 {
            return ReportSummary {
                count,
                mean_density: None,
                mean_score: None,
            };
        }
        let density_sum: f64 = self.rows.iter().map(|r| r.density.percent()).sum();
        let score_sum: f64 = self.rows.iter().map(|r| r.score.value()).sum();
        ReportSummary {
            count,
            mean_density: Some(density_sum / count as f64),
            mean_score: Some(score_sum / count as f64),
        }
    }

    /// Serialises the table as BOM-prefixed UTF-8 CSV with `\n` line endings.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(UTF8_BOM.to_vec());
        writer.write_record(COLUMNS)?;
        for record in &self.rows {
            writer.write_record(self.formatted_row(record))?;
        }
        writer
            .into_inner()
            .map_err(|err| ExportError::Csv(err.into_error().into()))
    }
}
