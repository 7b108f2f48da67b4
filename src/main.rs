use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use fibro_vision::core_modules::decoder::is_supported_file_name;
use fibro_vision::core_modules::preview::{preview_file_name, write_png};
use fibro_vision::core_modules::report::{DEFAULT_REPORT_FILE_NAME, ReportTable};
use fibro_vision::{
    AnalysisPipeline, BatchInput, BatchOutcome, CustomRangeScorer, ItemOutcome,
    ParallelPipeline, PipelineConfig, ScoringVariant,
};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fibro_vision")]
#[command(version, about = "Tissue density and fibrosis score for stained lung sections", long_about = None)]
struct Cli {
    /// Image files (JPG, PNG, TIF) or directories containing them
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Pipeline config file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scoring curve; overrides the config file
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// CSV report destination
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT_FILE_NAME)]
    report: PathBuf,

    /// Write a side-by-side preview (original | mask) per image into DIR
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,

    /// Number of parallel workers (default: one per CPU, 1 = sequential)
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Literature 12-75% density band on the 0-5 scale
    Biological,
    /// Calibrated narrow band (34-36% unless configured otherwise)
    Custom,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = build_config(&cli)?;
    let inputs = expand_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        bail!("no supported images found in the given inputs");
    }
    if let Some(dir) = &cli.preview_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create preview directory {}", dir.display()))?;
    }

    let preview_dir = cli.preview_dir.clone();
    let mut preview_names = HashMap::new();
    let observe =
        |item: &ItemOutcome| report_item(item, preview_dir.as_deref(), &mut preview_names);

    let outcome = match cli.jobs {
        Some(1) => AnalysisPipeline::new(config)?.run_batch(inputs, observe),
        jobs => run_parallel(config, jobs, inputs, observe)?,
    };

    let table = outcome.report.snapshot();
    print_table(&table);
    for failure in &outcome.failures {
        println!("skipped {}: {}", failure.filename, failure.error);
    }

    let bytes = table.export()?;
    fs::write(&cli.report, bytes)
        .with_context(|| format!("failed to write report {}", cli.report.display()))?;
    info!(
        "report written to {} ({} rows, {} skipped)",
        cli.report.display(),
        table.rows().len(),
        outcome.failures.len()
    );
    Ok(())
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    match cli.variant {
        Some(VariantArg::Biological) => config.scoring = ScoringVariant::BiologicalRange,
        Some(VariantArg::Custom) => {
            if !matches!(config.scoring, ScoringVariant::CustomRange(_)) {
                config.scoring = ScoringVariant::CustomRange(CustomRangeScorer::default());
            }
        }
        None => {}
    }
    config.render_previews = cli.preview_dir.is_some();
    config.validate()?;
    Ok(config)
}

fn run_parallel<F>(
    config: PipelineConfig,
    jobs: Option<usize>,
    inputs: Vec<BatchInput>,
    observe: F,
) -> Result<BatchOutcome>
where
    F: FnMut(&ItemOutcome),
{
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let pipeline = match jobs {
            Some(n) => ParallelPipeline::with_workers(config, n)?,
            None => ParallelPipeline::new(config)?,
        };
        Ok::<_, anyhow::Error>(pipeline.run_batch(inputs, observe).await)
    })
}

/// Files are taken as given; directories contribute their supported images, sorted.
fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<BatchInput>> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(BatchInput::from_path(path));
            continue;
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("failed to list {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .map(|name| is_supported_file_name(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
            .collect();
        entries.sort();
        inputs.extend(entries.into_iter().map(BatchInput::from_path));
    }
    Ok(inputs)
}

fn report_item(
    item: &ItemOutcome,
    preview_dir: Option<&Path>,
    preview_names: &mut HashMap<String, usize>,
) {
    let analysis = match item {
        ItemOutcome::Analysed(analysis) => analysis,
        ItemOutcome::Failed(_) => return,
    };
    println!(
        "{}: density {} score {} (threshold {})",
        analysis.record.filename,
        analysis.record.density,
        analysis.record.score,
        analysis.threshold.level
    );

    if let (Some(dir), Some(preview)) = (preview_dir, &analysis.preview) {
        let name = preview_file_name(&analysis.record.filename);
        // Same file name from two input directories.
        let uses = preview_names.entry(name.clone()).or_insert(0);
        *uses += 1;
        let name = match *uses {
            1 => name,
            n => format!("{}_{n}.png", name.trim_end_matches(".png")),
        };
        if let Err(err) = write_png(preview, &dir.join(name)) {
            warn!("{err}");
        }
    }
}

fn print_table(table: &ReportTable) {
    let [filename, density, score] = table.columns();
    println!();
    println!("{filename:<40} {density:>12} {score:>8}");
    for record in table.rows() {
        let [name, _, score] = table.formatted_row(record);
        println!(
            "{name:<40} {:>12.2} {score:>8}",
            record.density.percent()
        );
    }
    let summary = table.summary();
    if let (Some(mean_density), Some(mean_score)) = (summary.mean_density, summary.mean_score) {
        println!(
            "{} images, mean density {mean_density:.2}%, mean score {mean_score:.2}",
            summary.count
        );
    }
}
