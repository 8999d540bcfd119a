use anyhow::{Context, Result};
use std::path::PathBuf;

use imgblob::config::Config;
use imgblob::db::Database;
use imgblob::ingest::{IngestProgress, Ingestor};
use imgblob::logging;
use imgblob::viewer::{TerminalDisplay, Viewer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Ingest,
    View,
    List,
}

struct CliArgs {
    command: Command,
    config_path: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    extension: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        command: Command::Run,
        config_path: None,
        source_dir: None,
        db_path: None,
        extension: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "run" => cli.command = Command::Run,
            "ingest" => cli.command = Command::Ingest,
            "view" => cli.command = Command::View,
            "list" => cli.command = Command::List,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("imgblob {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            flag @ ("--config" | "-c" | "--source" | "-s" | "--db" | "-d" | "--ext" | "-e") => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires an argument", flag);
                    std::process::exit(1);
                };
                match flag {
                    "--config" | "-c" => cli.config_path = Some(PathBuf::from(value)),
                    "--source" | "-s" => cli.source_dir = Some(PathBuf::from(value)),
                    "--db" | "-d" => cli.db_path = Some(PathBuf::from(value)),
                    _ => cli.extension = Some(value.clone()),
                }
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn print_help() {
    println!(
        r#"imgblob - store a folder of images as blobs in SQLite and view them

USAGE:
    imgblob [COMMAND] [OPTIONS]

COMMANDS:
    run       Ingest, then view (default)
    ingest    Recreate the Images table from the source directory
    view      Show stored images one by one (any key: next, Esc/q: quit)
    list      Print ObjId, width and blob size of every stored image

OPTIONS:
    --config, -c PATH   Path to config file
    --source, -s DIR    Directory holding <integer>.<ext> images
    --db, -d PATH       SQLite database file
    --ext, -e EXT       Image extension to ingest (default: jpg)
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    IMGBLOB_CONFIG      Path to config file (overrides default location)
    IMGBLOB_LOG         Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/imgblob/config.toml"#
    );
}

fn main() -> Result<()> {
    let cli = parse_args();

    // Journald on Linux, file fallback otherwise; never the terminal.
    let _ = logging::init(None);

    let mut config = match cli.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(source_dir) = cli.source_dir {
        config.ingest.source_dir = source_dir;
    }
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    if let Some(extension) = cli.extension {
        config.ingest.extension = extension;
    }

    match cli.command {
        Command::Ingest => ingest(&config),
        Command::View => view(&config),
        Command::List => list(&config),
        Command::Run => {
            ingest(&config)?;
            view(&config)
        }
    }
}

fn ingest(config: &Config) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let ingestor = Ingestor::new(config.ingest.clone());

    let report = ingestor
        .ingest_with_progress(&db, |progress| match progress {
            IngestProgress::Started { total_files } => {
                println!("Number of files in folder: {}", total_files);
            }
            IngestProgress::Ingested { index, total, .. } => {
                println!("{} {}", index, total);
            }
            IngestProgress::Completed { inserted } => {
                println!("Stored {} images in {}", inserted, config.db_path.display());
            }
        })
        .with_context(|| format!("Ingest from {} failed", config.ingest.source_dir.display()))?;

    tracing::debug!(?report, "Ingest report");
    db.close()
}

fn view(config: &Config) -> Result<()> {
    let db = Database::open_existing(&config.db_path)?;

    let outcome = {
        let mut viewer = Viewer::new(TerminalDisplay::new(&config.viewer)?);
        viewer.run(&db)?
        // Terminal restored here, before anything is printed.
    };

    if outcome.stopped_early {
        println!("Viewed {} images (stopped early)", outcome.shown);
    } else {
        println!("Viewed {} images", outcome.shown);
    }
    db.close()
}

fn list(config: &Config) -> Result<()> {
    let db = Database::open_existing(&config.db_path)?;

    println!("{:>10} {:>8} {:>12}", "ObjId", "size", "bytes");
    for summary in db.list_images()? {
        println!(
            "{:>10} {:>8} {:>12}",
            summary.obj_id, summary.width, summary.payload_len
        );
    }

    db.close()
}
