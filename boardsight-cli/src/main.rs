mod batch;
mod config;
mod detect;
mod report;
mod watch;

use boardsight::TroopCatalog;
use clap::{Parser, Subcommand};
use config::Config;
use detect::{load_rgb, Detector};
use report::BoardReport;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "BoardSight CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable library tracing output for profiling.
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every screenshot in a directory and write a JSON report.
    Batch {
        /// Overrides `batch.screenshots_dir`.
        #[arg(long, value_name = "DIR")]
        screenshots: Option<PathBuf>,
        /// Overrides `batch.output_dir`.
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Do not save highlighted copies.
        #[arg(long)]
        no_highlight: bool,
    },
    /// Read the board from one image.
    Board {
        image: PathBuf,
        /// Print JSON instead of the text summary.
        #[arg(long)]
        json: bool,
    },
    /// Re-read a frame file periodically and print the board each cycle.
    Watch {
        /// Overrides `watch.frame_path`.
        #[arg(long, value_name = "FILE")]
        frame: Option<PathBuf>,
        /// Overrides `watch.interval_ms`.
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Stop after this many cycles.
        #[arg(long, value_name = "N")]
        cycles: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let directive = if cli.trace {
        "boardsight=info"
    } else {
        "boardsight=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(directive.parse()?)
                .add_directive("boardsight_cli=info".parse()?),
        )
        .with_target(false)
        .init();

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }
    let Some(command) = cli.command else {
        return Err("no command given; see --help".into());
    };

    let config: Config = match fs::read_to_string(&cli.config) {
        Ok(text) => serde_json::from_str(&text)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found; using defaults", cli.config.display());
            Config::default()
        }
        Err(err) => return Err(err.into()),
    };
    let detector = Detector::from_config(&config)?;

    match command {
        Command::Batch {
            screenshots,
            output,
            no_highlight,
        } => {
            let mut opts = config.batch.clone();
            if let Some(dir) = screenshots {
                opts.screenshots_dir = dir;
            }
            if let Some(dir) = output {
                opts.output_dir = dir;
            }
            opts.highlight &= !no_highlight;
            let report = batch::run(&detector, &opts)?;
            println!(
                "Processed {} screenshot(s), {} match(es); report written to {}",
                report.detection_summary.total_screenshots,
                report.detection_summary.total_matches,
                opts.output_dir.join(&opts.report_name).display()
            );
        }
        Command::Board { image, json } => {
            let rgb = load_rgb(&image)?;
            let (out, board) = detector.detect(&rgb)?;
            let catalog = TroopCatalog::standard();
            if json {
                let report = BoardReport::new(&out, &board, catalog);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", board.summary().render(Some(catalog)));
            }
        }
        Command::Watch {
            frame,
            interval_ms,
            cycles,
        } => {
            let mut opts = config.watch.clone();
            if let Some(path) = frame {
                opts.frame_path = path;
            }
            if let Some(ms) = interval_ms {
                opts.interval_ms = ms;
            }
            watch::run(Arc::new(detector), opts, cycles);
        }
    }

    Ok(())
}
