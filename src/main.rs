use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod clean;
mod error;
mod logging;
mod model;
mod render;
mod session;
mod spec;
mod table;

pub type Result<T> = anyhow::Result<T>;

use anyhow::{Context, bail};
use session::{Loaded, Session};
use spec::{ColumnRefSpec, DatasetSpec};

#[derive(Parser)]
#[command(name = "survey-dash")]
#[command(about = "Survey CSV cleaner and report generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a self-contained HTML report.
    Report {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// Keep running and re-render whenever the CSV changes (poll interval, seconds).
        #[arg(long)]
        watch: Option<u64>,
    },
    /// Print the report data as JSON.
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the cleaned table as CSV.
    Clean {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    #[arg(long)]
    csv: PathBuf,

    /// Dataset spec (JSON). Without one, --value is required.
    #[arg(long)]
    spec: Option<PathBuf>,

    #[arg(long)]
    value: Option<String>,

    #[arg(long)]
    group: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    geometry: Option<String>,

    #[arg(long)]
    delimiter: Option<String>,

    /// Keep only listed categories of a column, e.g. `gender=Male,Female`. Repeatable.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, Vec<String>)>,
}

fn parse_filter(s: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (col, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE[,VALUE...], got {:?}", s))?;
    let col = col.trim();
    if col.is_empty() {
        return Err(format!("empty column name in filter {:?}", s));
    }
    let values = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    Ok((col.to_string(), values))
}

/// Spec file (if any) with command-line overrides applied.
fn build_spec(args: &SourceArgs) -> Result<DatasetSpec> {
    let mut spec = match (&args.spec, &args.value) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read spec file {}", path.display()))?;
            serde_json::from_str::<DatasetSpec>(&text)
                .with_context(|| format!("parse spec file {}", path.display()))?
        }
        (None, Some(value)) => DatasetSpec::for_value(value),
        (None, None) => bail!("either --spec or --value is required"),
    };

    if let Some(v) = &args.value {
        spec.value = ColumnRefSpec::Name(v.clone());
    }
    if let Some(g) = &args.group {
        spec.group = Some(ColumnRefSpec::Name(g.clone()));
    }
    if let Some(l) = &args.location {
        spec.location = Some(ColumnRefSpec::Name(l.clone()));
    }
    if let Some(g) = &args.geometry {
        spec.geometry = Some(ColumnRefSpec::Name(g.clone()));
    }
    if let Some(d) = &args.delimiter {
        spec.delimiter = Some(d.clone());
    }
    for (col, values) in &args.filters {
        spec.filters.insert(col.clone(), values.clone());
    }
    Ok(spec)
}

/// Load through the session and write the report. If anything after the
/// load fails, the cached entry is dropped so the next attempt starts over.
fn write_report(session: &mut Session, csv: &Path, out: &Path) -> Result<()> {
    let loaded = session.load(csv)?;
    let written = render_to(&loaded, out);
    if written.is_err() {
        session.invalidate(csv);
    }
    written
}

fn render_to(loaded: &Loaded, out: &Path) -> Result<()> {
    let data = model::build_report_data(&loaded.table, &loaded.spec)?;
    let html = render::render_html_report(&data)?;
    std::fs::write(out, html).with_context(|| format!("write {}", out.display()))?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn main() -> Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Report { source, out, watch } => {
            let mut session = Session::new(build_spec(&source)?);

            // 1) One-shot: any load failure ends the run, nothing is written.
            let Some(secs) = watch else {
                return write_report(&mut session, &source.csv, &out);
            };

            // 2) Watch: a failed reload is logged and the previous report is
            // left in place until the source loads again.
            let interval = Duration::from_secs(secs.max(1));
            tracing::info!(path = %source.csv.display(), every = ?interval, "watching");
            loop {
                if !session.is_fresh(&source.csv) {
                    match write_report(&mut session, &source.csv, &out) {
                        Ok(()) => tracing::debug!(cached = session.len(), "report refreshed"),
                        Err(e) => tracing::error!("{:#}", e),
                    }
                }
                std::thread::sleep(interval);
            }
        }
        Commands::Summary { source } => {
            let mut session = Session::new(build_spec(&source)?);
            let loaded = session.load(&source.csv)?;
            let data = model::build_report_data(&loaded.table, &loaded.spec)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Clean { source } => {
            let mut session = Session::new(build_spec(&source)?);
            let delimiter = session.spec().delimiter()?;
            let loaded = session.load(&source.csv)?;
            loaded
                .table
                .write_csv(std::io::stdout().lock(), delimiter)?;
        }
    }

    Ok(())
}
