mod aggregate;
mod classifier;
mod config;
mod dataset;
mod enrich;
mod error;
mod export;
mod logging;
mod report;
mod timeline;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use timeline_types::{RecordsFile, TimelineFile, TimelinePoint, TimelineStats};

use aggregate::EntityAggregator;
use classifier::EntityClassifier;
use config::{ColumnPreset, FileConfig, Overrides, Settings};
use enrich::{Enricher, MissingTextPolicy};
use error::Result;
use export::ExportFormat;
use timeline::LayoutEngine;

const DEFAULT_DATASET: &str = "dataset.csv";
const RECORDS_FILE: &str = "records.json";
const TIMELINE_FILE: &str = "timeline.json";

#[derive(Parser)]
#[command(
    name = "entity_timeline",
    version,
    about = "Historical event entity enrichment and timeline layout"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(Args)]
struct GlobalOpts {
    /// JSON config file; command-line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset header convention
    #[arg(long, value_enum, global = true)]
    columns: Option<ColumnPreset>,

    #[arg(long, global = true)]
    date_column: Option<String>,

    #[arg(long, global = true)]
    event_column: Option<String>,

    #[arg(long, global = true)]
    description_column: Option<String>,

    /// Gazetteer JSON (label → list of names); the bundled one by default
    #[arg(long, global = true)]
    gazetteer: Option<PathBuf>,

    /// Earliest year the timeline treats as representable
    #[arg(long, global = true, allow_negative_numbers = true)]
    min_year: Option<i32>,

    /// Latest year the timeline treats as representable
    #[arg(long, global = true, allow_negative_numbers = true)]
    max_year: Option<i32>,

    /// Directory for records.json, timeline.json and exports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Drop records with a missing description instead of failing
    #[arg(long, global = true)]
    skip_missing: bool,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write rotating log files here
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

impl GlobalOpts {
    fn overrides(&self) -> Overrides {
        Overrides {
            preset: self.columns,
            date_column: self.date_column.clone(),
            event_column: self.event_column.clone(),
            description_column: self.description_column.clone(),
            gazetteer: self.gazetteer.clone(),
            min_year: self.min_year,
            max_year: self.max_year,
            output_dir: self.output_dir.clone(),
            missing_text: self.skip_missing.then_some(MissingTextPolicy::Skip),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Enrich records with entities, print the summary, export → output/
    Analyze {
        /// Dataset file (.csv or .json)
        #[arg(default_value = DEFAULT_DATASET)]
        input: PathBuf,
        /// Export format; asked interactively when omitted
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Skip the export step
        #[arg(long, conflicts_with = "format")]
        no_export: bool,
        /// Aggregate records on a worker pool
        #[arg(long)]
        parallel: bool,
    },
    /// Lay records out on a timeline → output/timeline.json
    Timeline {
        /// Dataset file (.csv or .json)
        #[arg(default_value = DEFAULT_DATASET)]
        input: PathBuf,
    },
    /// Print the classifier's raw spans for a text (stdin when omitted)
    Classify { text: Vec<String> },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match logging::init_logging(&cli.opts.log_level, cli.opts.log_dir.as_deref()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = e.remediation() {
                eprintln!("{hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = match &cli.opts.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, cli.opts.overrides())?;

    match cli.command {
        Some(Command::Analyze {
            input,
            format,
            no_export,
            parallel,
        }) => run_analyze(&settings, &input, format, no_export, parallel),
        Some(Command::Timeline { input }) => run_timeline(&settings, &input),
        Some(Command::Classify { text }) => run_classify(&settings, &text),
        // Default: analyze the dataset in the current directory
        None => run_analyze(&settings, Path::new(DEFAULT_DATASET), None, false, false),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  OUTPUT FILE HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn write_json<T: serde::Serialize>(dir: &Path, name: &str, data: &T) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(&path, &json)?;
    eprintln!("  {} ({} bytes)", path.display(), json.len());
    Ok(path)
}

fn timeline_file(engine: &LayoutEngine, points: Vec<TimelinePoint>) -> TimelineFile {
    TimelineFile {
        stats: TimelineStats::from_points(&points),
        bounds: engine.bounds(),
        points,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  ANALYZE MODE: enrich → console summary → output/*.json → export
// ═══════════════════════════════════════════════════════════════════════

fn run_analyze(
    settings: &Settings,
    input: &Path,
    format: Option<ExportFormat>,
    no_export: bool,
    parallel: bool,
) -> Result<()> {
    // Loaded once, borrowed by every aggregation for the rest of the run
    let classifier = classifier::load_classifier(settings.gazetteer.as_deref())?;
    let records = dataset::load(input, &settings.columns)?;

    eprintln!("Analyzing historical events...\n");

    let enricher = Enricher::new(
        EntityAggregator::new(&classifier),
        &settings.columns.description,
    )
    .with_policy(settings.missing_text)
    .with_parallel(parallel);
    let enrichment = enricher.enrich(records)?;

    eprintln!("\n--- Analysis Complete ---\n");

    {
        let mut out = io::stdout().lock();
        report::write_summary(&mut out, &enrichment.rows, &enrichment.insights)?;
        out.flush()?;
    }

    if !enrichment.skipped.is_empty() {
        let rows: Vec<String> = enrichment.skipped.iter().map(|r| r.to_string()).collect();
        eprintln!(
            "\nSkipped {} record(s) with no {}: #{}",
            rows.len(),
            settings.columns.description,
            rows.join(", #")
        );
    }

    // ── Data files for the web frontend ─────────────────────────────
    eprintln!("\nWriting output files:");
    write_json(
        &settings.output_dir,
        RECORDS_FILE,
        &RecordsFile {
            records: enrichment.rows.iter().map(|r| r.to_record()).collect(),
            insights: enrichment.insights,
            skipped: enrichment.skipped.clone(),
        },
    )?;

    let engine = LayoutEngine::new(settings.bounds);
    let points = engine.layout(
        enrichment
            .rows
            .iter()
            .map(|r| (r.date.as_str(), r.event.as_str())),
    );
    write_json(
        &settings.output_dir,
        TIMELINE_FILE,
        &timeline_file(&engine, points),
    )?;

    // ── Export ──────────────────────────────────────────────────────
    if no_export {
        return Ok(());
    }

    let format = match format {
        Some(f) => Some(f),
        None => {
            let (choice, parsed) =
                export::prompt_format(&mut io::stdin().lock(), &mut io::stdout().lock())?;
            if parsed.is_none() {
                eprintln!("Invalid choice {choice:?}. No file saved.");
            }
            parsed
        }
    };

    if let Some(format) = format {
        let path = export::export(
            &enrichment.rows,
            &settings.columns,
            format,
            &settings.output_dir,
        )?;
        println!("Saved as {}", path.display());
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  TIMELINE MODE: lay out dates → stdout + output/timeline.json
// ═══════════════════════════════════════════════════════════════════════

fn run_timeline(settings: &Settings, input: &Path) -> Result<()> {
    let records = dataset::load(input, &settings.columns)?;

    let engine = LayoutEngine::new(settings.bounds);
    let points = engine.layout(records.iter().map(|r| (r.date.as_str(), r.event.as_str())));

    {
        let mut out = io::stdout().lock();
        report::write_timeline(&mut out, &points)?;
        out.flush()?;
    }

    let file = timeline_file(&engine, points);
    let s = &file.stats;
    eprintln!(
        "\n{} events: {} exact, {} year only, {} clamped, {} unknown (years {}..={})",
        s.total, s.exact, s.year_only, s.clamped, s.unknown, file.bounds.min_year, file.bounds.max_year
    );

    write_json(&settings.output_dir, TIMELINE_FILE, &file)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  CLASSIFY MODE: inspect the classifier on one text
// ═══════════════════════════════════════════════════════════════════════

fn run_classify(settings: &Settings, words: &[String]) -> Result<()> {
    let classifier = classifier::load_classifier(settings.gazetteer.as_deref())?;

    let text = if words.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        words.join(" ")
    };

    let spans = classifier.classify(&text);
    println!("{}", serde_json::to_string_pretty(&spans)?);

    let e = EntityAggregator::new(&classifier).aggregate(&text);
    eprintln!(
        "people={} locations={} organizations={} words={} unique={}",
        e.people.len(),
        e.locations.len(),
        e.organizations.len(),
        e.word_count,
        e.unique_entity_count
    );
    Ok(())
}
