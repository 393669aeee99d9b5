use clap::{Parser, Subcommand};
use shot_capture::camera::{Camera, FolderCamera};
use shot_capture::config::{self, CaptureConfig};
use shot_capture::ingest;
use shot_capture::output;
use shot_capture::preview::PreviewRegistry;
use shot_capture::session::{Session, SessionStatus};
use shot_capture::storage::{
    DirectoryStore, DownloadsFolder, Downloader, LocalDirectoryStore, Persistence,
};
use shot_capture::tabular::AutoDecoder;
use shot_capture::workflow::Workflow;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Parser)]
#[command(name = "shot-capture")]
#[command(about = "Guided shot-list photo capture")]
#[command(long_about = "\
Guided shot-list photo capture

Load a shot list, then capture each shot in order. Every accepted image is
saved under the filename the list gives it.

Shot list format (CSV, or the first sheet of an .xlsx/.xls/.ods workbook;
first row is the header, column order is free):

  ItemID,ItemColor,ViewType,Filename
  A1,red,front,A1-red-front.jpg
  A1,red,back,A1-red-back.jpg

Rows with a blank Filename are skipped. Extra columns are ignored.

Frames come from a hot folder (camera.source_dir): point your tethering
software at it and each capture takes the newest image there.

Run 'shot-capture gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a shot list and print it
    Check {
        /// Shot list file
        list: PathBuf,
        /// Print the shot list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Walk a shot list: capture, review, and save each shot
    Run {
        /// Shot list file
        list: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { list, json } => {
            let bytes = std::fs::read(&list)?;
            let report = ingest::ingest_report(&AutoDecoder::new(), &bytes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("==> Checking {}", list.display());
                output::print_shot_list(&report);
                println!("==> Shot list is valid");
            }
        }
        Command::Run { list } => {
            let config = config::load_config(&cli.config)?;
            run(&config, &list)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

const COMMANDS: &str = "[c]apture  [a]ccept  [r]etake  [s]tart over  [q]uit";

fn run(config: &CaptureConfig, list: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Held for the whole session: spooled previews live in here.
    let spool = if config.preview.spool {
        Some(TempDir::new()?)
    } else {
        None
    };
    let previews = match &spool {
        Some(dir) => PreviewRegistry::spooled(dir.path()),
        None => PreviewRegistry::new(),
    };

    let store = match &config.storage.directory {
        Some(dir) => LocalDirectoryStore::fixed(dir),
        None => LocalDirectoryStore::new(Box::new(|| {
            prompt_line("Save directory (empty to cancel): ").map(PathBuf::from)
        })),
    };
    let fallback = config
        .storage
        .fallback
        .then(|| DownloadsFolder::new(&config.storage.downloads_dir));

    let mut workflow = Workflow::new(
        Session::new(previews),
        FolderCamera::new(&config.camera.source_dir, config.camera.jpeg_quality),
        config.camera.constraints(),
        Persistence::new(Some(store), fallback),
    );

    load(&mut workflow, list)?;
    loop {
        while workflow.snapshot().status != SessionStatus::Finished {
            println!();
            output::print_snapshot(&workflow.snapshot());
            let Some(answer) = prompt_line(&format!("{COMMANDS} > ")) else {
                return Ok(());
            };
            match answer.as_str() {
                "c" => {
                    workflow.capture();
                }
                "a" => {
                    workflow.accept();
                }
                "r" => {
                    workflow.retake();
                }
                "s" => {
                    workflow.reset();
                    break;
                }
                "q" => return Ok(()),
                other => println!("Unknown command '{other}'. {COMMANDS}"),
            }
        }

        if workflow.snapshot().status == SessionStatus::Finished {
            println!();
            output::print_snapshot(&workflow.snapshot());
        }

        if !load_next(&mut workflow, || prompt_line("Next shot list (empty to quit): ")) {
            return Ok(());
        }
    }
}

/// Ask for shot lists until one loads; a list that fails is reported and
/// asked for again. `false` once the operator gives no answer.
fn load_next<C: Camera, S: DirectoryStore, D: Downloader>(
    workflow: &mut Workflow<C, S, D>,
    mut ask: impl FnMut() -> Option<String>,
) -> bool {
    while let Some(next) = ask() {
        workflow.reset();
        match load(workflow, Path::new(&next)) {
            Ok(()) => return true,
            Err(e) => println!("Error: {e}"),
        }
    }
    false
}

fn load<C: Camera, S: DirectoryStore, D: Downloader>(
    workflow: &mut Workflow<C, S, D>,
    list: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(list)
        .map_err(|e| format!("could not read {}: {e}", list.display()))?;
    for row in workflow.load_shot_list(&AutoDecoder::new(), &bytes)? {
        println!("Skipped row {}: {}", row.row, row.reason);
    }
    Ok(())
}

/// Print `prompt` and read one trimmed line from stdin. `None` on EOF, on
/// a read error, or for an empty answer.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    std::io::stdout().flush().ok()?;
    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim();
    (read > 0 && !line.is_empty()).then(|| line.to_string())
}
