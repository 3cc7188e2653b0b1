//! kicad-impart: merge vendor component archives into KiCad legacy libraries
//!
//! Repeatedly asks for a component archive from the source directory and
//! files its symbol, description and footprints into the matching vendor
//! library. Ctrl+C abandons the current archive; end of input (Ctrl+D)
//! quits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use kicad_impart::cancel::{install_interrupt_handler, CancelToken};
use kicad_impart::config;
use kicad_impart::console::{Console, LinePrompter};
use kicad_impart::impart::{initialize_libraries, list_archives, Importer};
use kicad_impart::kicad::{ImpartError, Library};

/// Merge vendor component archives into per-vendor KiCad libraries.
///
/// Supports Octopart/EE Concierge, SamacSys, Ultra Librarian and SnapEDA
/// KiCad exports.
#[derive(Parser, Debug)]
#[command(name = "kicad-impart")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Directory scanned for component archives (overrides the config file)
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Directory holding the vendor libraries (overrides the config file)
    #[arg(long, value_name = "DIR")]
    library_dir: Option<PathBuf>,

    /// Erase/initialise vendor libraries before importing
    #[arg(long)]
    init: bool,

    /// Delete each archive after it has been fully imported
    #[arg(long)]
    zap: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for kicad-impart.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    let library_dir = match cfg.resolve_library_dir(args.library_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if let Some(default_path) = config::default_config_path() {
                eprintln!("\nDefault settings file: {}", default_path.display());
            }
            return ExitCode::FAILURE;
        }
    };
    let source_dir = args
        .source_dir
        .or(cfg.source_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let zap = args.zap || cfg.delete_imported;

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "kicad-impart {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        library = %library_dir.display(),
        source = %source_dir.display(),
        "Starting kicad-impart"
    );

    let cancel = CancelToken::new();
    if let Err(e) = install_interrupt_handler(cancel.clone()) {
        warn!(error = %e, "Ctrl+C will terminate instead of cancelling");
    }

    let library = Library::new(library_dir);
    let importer =
        Importer::new(library.clone()).with_footprint_extensions(cfg.footprint_extensions);

    let mut prompter = LinePrompter::stdio();
    let mut console = Console::new(&mut prompter, cancel.clone());

    if args.init {
        match initialize_libraries(&library, &mut console) {
            Ok(vendors) => info!(count = vendors.len(), "Libraries initialised"),
            Err(e) if e.is_fatal() => {
                println!("EOF");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                error!(error = %e, "Initialisation failed");
                println!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }

    loop {
        cancel.reset();

        let archives = match list_archives(&source_dir) {
            Ok(archives) => archives,
            Err(e) => {
                error!(error = %e, "Cannot list archives");
                return ExitCode::FAILURE;
            }
        };

        let reply = match console.choose("Library zip file: ", &archives) {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => break,
            Err(ImpartError::Cancelled) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if reply.is_empty() {
            continue;
        }

        let archive = source_dir.join(&reply);
        match importer.import(&archive, &mut console) {
            Ok(outcome) => {
                println!("{outcome}");
                if zap && outcome.is_imported() {
                    match std::fs::remove_file(&archive) {
                        Ok(()) => info!(archive = %archive.display(), "Deleted archive"),
                        Err(e) => warn!(archive = %archive.display(), error = %e, "Cannot delete archive"),
                    }
                }
            }
            Err(e) if e.is_fatal() => break,
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Import failed");
                println!("{e}");
            }
        }
    }

    println!("EOF");
    ExitCode::SUCCESS
}
