use anyhow::{Context, Result};
use clap::Parser;
use rmlines::{
    doc::Document,
    render::{self, svg::SvgCanvas, PageGeometry},
};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{info, warn};

/// Decode reMarkable `.lines` files and render them as vector graphics.
#[derive(Parser, Debug)]
#[command(name = "rmlines-cli", version, about)]
struct Cli {
    /// One or more `.lines` input files.
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output file (single input) or directory (multiple inputs).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print stroke/layer statistics instead of rendering.
    #[arg(long)]
    analyze: bool,

    /// Suppress per-file progress logging.
    #[arg(short, long)]
    quiet: bool,

    /// In batch mode, re-render files even if the output already exists.
    #[arg(short, long)]
    force: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { tracing::Level::WARN } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    if cli.input.is_empty() {
        eprintln!("no input files given");
        return ExitCode::FAILURE;
    }

    if cli.input.len() == 1 && cli.input[0].is_dir() {
        run_backup(&cli);
        // Batch invocations always succeed at the process level; failures are reported per file.
        ExitCode::SUCCESS
    } else if cli.input.len() == 1 {
        let input = &cli.input[0];
        let output = cli.output.clone().unwrap_or_else(|| default_output_path(input));

        match run_one(input, &output, cli.analyze) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error processing {}: {err:#}", input.display());
                ExitCode::FAILURE
            }
        }
    } else {
        run_batch(&cli);
        // Batch invocations always succeed at the process level; failures are reported per file.
        ExitCode::SUCCESS
    }
}

/// A single directory input is treated as a xochitl-style backup directory rather than a lone
/// `.lines` file, mirroring `original_source/export.py`'s own CLI (a backup directory positional
/// argument, `-o/--output` as the destination tree) rather than the flat-file `__main__.py` one.
fn run_backup(cli: &Cli) {
    let backup_dir = &cli.input[0];
    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));

    match rmlines::export::export_backup(backup_dir, &output_dir) {
        Ok(stats) if !cli.quiet => info!(
            "exported {} page(s) from {} document(s), {} skipped",
            stats.pages, stats.documents, stats.skipped
        ),
        Ok(_) => {}
        Err(err) => warn!("failed to export backup {}: {err}", backup_dir.display()),
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(if input.extension().is_some() { "out.svg" } else { "svg" })
}

fn run_one(input: &Path, output: &Path, analyze: bool) -> Result<()> {
    let document = Document::parse_file(input)
        .with_context(|| format!("parsing {}", input.display()))?;

    if analyze {
        print_stats(input, &document);
        return Ok(());
    }

    let mut canvas = SvgCanvas::new();
    render::render(&document, &mut canvas, PageGeometry::default())
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("rendering {}", input.display()))?;

    std::fs::write(output, canvas.into_document())
        .with_context(|| format!("writing {}", output.display()))?;

    info!("{} -> {}", input.display(), output.display());
    Ok(())
}

fn print_stats(input: &Path, document: &Document) {
    let stroke_count: usize = document.layers.iter().map(|layer| layer.strokes.len()).sum();
    let point_count: usize =
        document.layers.iter().flat_map(|layer| &layer.strokes).map(|s| s.points.len()).sum();

    println!(
        "{}: {} layer(s), {} stroke(s), {} point(s)",
        input.display(),
        document.layers.len(),
        stroke_count,
        point_count
    );
}

fn run_batch(cli: &Cli) {
    let output_dir = cli.output.clone();
    let output_for = |input: &Path| -> PathBuf {
        let name = input.with_extension("svg");
        match &output_dir {
            Some(dir) => dir.join(name.file_name().unwrap_or_default()),
            None => name,
        }
    };

    // Incremental by default: skip inputs whose output already exists unless `--force` asked to
    // redo everything.
    let pending: Vec<PathBuf> = cli
        .input
        .iter()
        .filter(|input| cli.force || !output_for(input).exists())
        .cloned()
        .collect();

    let skipped = cli.input.len() - pending.len();
    if skipped > 0 && !cli.quiet {
        info!("skipping {skipped} already-rendered file(s); pass --force to redo them");
    }

    let outcomes = rmlines::export::export_batch(&pending, output_for);

    #[cfg(feature = "progress")]
    let bar = (!cli.quiet).then(|| progress_bar(outcomes.len() as u64));

    for outcome in &outcomes {
        #[cfg(feature = "progress")]
        if let Some(bar) = &bar {
            bar.inc(1);
        }

        match &outcome.result {
            Ok(path) if !cli.quiet => info!("{} -> {}", outcome.input.display(), path.display()),
            Ok(_) => {}
            Err(message) => warn!("{}: {message}", outcome.input.display()),
        }
    }

    #[cfg(feature = "progress")]
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

#[cfg(feature = "progress")]
fn progress_bar(len: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar
}
