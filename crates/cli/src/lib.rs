use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use marginalia_core::persistence::export_file_name;
use marginalia_core::{
    filter, import_json, redraw_canvas, search, AnnotationCounts, AnnotationKind, AnnotationSet,
    EngineConfig, FilterCriteria, RasterCanvas, SearchResult, Timestamp,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest image edge `render` will produce
const MAX_RENDER_EDGE: u32 = 8192;

/// Blank border around the inferred drawing extent
const RENDER_MARGIN: f64 = 16.0;

#[derive(Debug, Parser)]
#[command(name = "marginalia")]
#[command(about = "Inspect and render exported annotation sets")]
pub struct Cli {
    /// Engine config file (JSON); environment overrides apply otherwise
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print per-collection counts and the most recent annotations.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
    /// Search highlight, note and floating text bodies.
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Filter a set by type, color and date range.
    Filter {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Annotation type to keep (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
        /// Color to keep (repeatable)
        #[arg(long = "color", value_name = "COLOR")]
        colors: Vec<String>,
        /// Earliest timestamp: YYYY-MM-DD, RFC 3339 or epoch milliseconds
        #[arg(long)]
        from: Option<String>,
        /// Latest timestamp (inclusive; a bare date covers the whole day)
        #[arg(long)]
        to: Option<String>,
        /// Output file, or a directory to receive `annotations-<name>.json`
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rasterize the drawings layer to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    counts: AnnotationCounts,
    recent: Vec<RecentOutput>,
}

#[derive(Debug, Serialize)]
struct RecentOutput {
    #[serde(rename = "type")]
    kind: AnnotationKind,
    id: String,
    timestamp: Timestamp,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file, recent } => run_info(&file, recent),
        Commands::Search { file, query } => run_search(&file, &query, &config),
        Commands::Filter { file, types, colors, from, to, output } => {
            let criteria = build_criteria(&types, &colors, from.as_deref(), to.as_deref())?;
            run_filter(&file, &criteria, output.as_deref())
        }
        Commands::Render { file, width, height, output } => {
            run_render(&file, width, height, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => EngineConfig::from_env().context("invalid engine configuration in environment"),
    }
}

fn run_info(file: &Path, recent: usize) -> Result<()> {
    let set = read_set(file)?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        counts: set.counts(),
        recent: set
            .recent(recent)
            .into_iter()
            .map(|a| RecentOutput { kind: a.kind(), id: a.id().to_string(), timestamp: a.timestamp() })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_search(file: &Path, query: &str, config: &EngineConfig) -> Result<()> {
    let set = read_set(file)?;
    let results: Vec<SearchResult> = search(&set, query, config.search_preview_chars);
    tracing::info!(query, hits = results.len(), "search finished");

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_filter(file: &Path, criteria: &FilterCriteria, output: Option<&Path>) -> Result<()> {
    let set = read_set(file)?;
    let filtered = filter(&set, criteria, Utc::now().timestamp_millis());
    let json = marginalia_core::export_json(&filtered).context("failed to serialize filtered set")?;

    match output {
        Some(output) => {
            let output = if output.is_dir() {
                output.join(export_file_name(document_stem(file)))
            } else {
                output.to_owned()
            };
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, json)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("{}", output.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_render(file: &Path, width: Option<u32>, height: Option<u32>, output: Option<&Path>) -> Result<()> {
    let set = read_set(file)?;

    let (auto_width, auto_height) = drawing_extent(&set);
    let width = width.unwrap_or(auto_width);
    let height = height.unwrap_or(auto_height);
    if width == 0 || height == 0 {
        anyhow::bail!("--width and --height must be >= 1");
    }
    if width > MAX_RENDER_EDGE || height > MAX_RENDER_EDGE {
        anyhow::bail!("image size {width}x{height} exceeds {MAX_RENDER_EDGE}px");
    }

    let mut canvas = RasterCanvas::new(width, height);
    redraw_canvas(&mut canvas, &set.drawings, true);

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    canvas
        .into_image()
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn read_set(path: &Path) -> Result<AnnotationSet> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json).context("failed to parse annotation set")
}

fn build_criteria(
    types: &[String],
    colors: &[String],
    from: Option<&str>,
    to: Option<&str>,
) -> Result<FilterCriteria> {
    let types = types
        .iter()
        .map(|t| t.parse::<AnnotationKind>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()?;

    Ok(FilterCriteria {
        types,
        colors: colors.to_vec(),
        date_from: from.map(|v| parse_timestamp(v, false)).transpose().context("invalid --from")?,
        date_to: to.map(|v| parse_timestamp(v, true)).transpose().context("invalid --to")?,
    })
}

/// Parse a date bound into epoch milliseconds
///
/// A bare date means the start of that day (UTC), or its last millisecond
/// when `end_of_day` is set.
fn parse_timestamp(value: &str, end_of_day: bool) -> Result<Timestamp> {
    if let Ok(millis) = value.parse::<Timestamp>() {
        return Ok(millis);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.timestamp_millis());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("unrecognized date: {value}"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .context("invalid time of day")?;

    Ok(date.and_time(time).and_utc().timestamp_millis())
}

/// Image size covering every stroke point plus a margin
fn drawing_extent(set: &AnnotationSet) -> (u32, u32) {
    let (max_x, max_y) = set
        .drawings
        .iter()
        .flat_map(|d| d.points.iter())
        .fold((0.0f64, 0.0f64), |(mx, my), p| (mx.max(p.x), my.max(p.y)));

    let edge = |max: f64| ((max + RENDER_MARGIN).ceil().max(1.0) as u32).min(MAX_RENDER_EDGE);
    (edge(max_x), edge(max_y))
}

fn document_stem(file: &Path) -> &str {
    file.file_stem().and_then(|name| name.to_str()).unwrap_or("annotations")
}

fn default_render_output(file: &Path) -> PathBuf {
    file.with_file_name(format!("{}-drawings.png", document_stem(file)))
}
