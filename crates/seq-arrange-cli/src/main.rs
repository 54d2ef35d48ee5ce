use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use seq_arrange_core::export::{load_exported_objects, load_printer_geometry, save_arrangement};
use seq_arrange_core::prelude::*;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "seq-arrange",
    about = "Schedule objects for sequential (one object at a time) printing",
    version,
    author
)]
struct Cli {
    /// Objects export path
    #[arg(long = "input-file", default_value = "arrange_data_export.txt", help_heading = "Input/Output")]
    input_file: PathBuf,
    /// Arrangement import path (one file per plate when non-interactive)
    #[arg(long = "output-file", default_value = "arrange_data_import.txt", help_heading = "Input/Output")]
    output_file: PathBuf,
    /// Printer geometry JSON; defaults to the built-in MK4 table
    #[arg(long = "printer-file", help_heading = "Input/Output")]
    printer_file: Option<PathBuf>,

    /// Objects decided together by one solver group
    #[arg(long = "object-group-size", default_value_t = 4, help_heading = "Solver")]
    object_group_size: usize,
    /// Enable polygon decimation
    #[arg(long, value_parser = ["yes", "no"], default_value = "yes", help_heading = "Solver")]
    decimation: String,
    /// Decimation tolerance selector
    #[arg(long, value_parser = ["low", "high"], default_value = "high", help_heading = "Solver")]
    precision: String,
    /// Consequential variant (yes) or sequential variant (no)
    #[arg(long, value_parser = ["yes", "no"], default_value = "yes", help_heading = "Solver")]
    assumptions: String,
    /// Reuse one output file and wait between plates (yes) vs plate-suffixed files (no)
    #[arg(long, value_parser = ["yes", "no"], default_value = "no", help_heading = "Input/Output")]
    interactive: String,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, global = true, help_heading = "Logging/UX")]
    quiet: bool,
}

fn plate_suffixed_path(path: &Path, plate_index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|s| s.to_string_lossy().into_owned());
    let file_name = match extension {
        Some(ext) => format!("{stem}_{plate_index:03}.{ext}"),
        None => format!("{stem}_{plate_index:03}"),
    };
    path.with_file_name(file_name)
}

fn run(cli: &Cli) -> anyhow::Result<Vec<ScheduledPlate>> {
    let printer_geometry = match &cli.printer_file {
        Some(path) => load_printer_geometry(path)
            .with_context(|| format!("cannot load printer geometry from {}", path.display()))?,
        None => presets::printer_geometry_mk4(),
    };

    let mut config = SolverConfiguration::from_printer_geometry(&printer_geometry);
    config.object_group_size = cli.object_group_size;
    config.decimation_precision = if cli.decimation == "no" {
        DecimationPrecision::Undefined
    } else if cli.precision == "high" {
        DecimationPrecision::High
    } else {
        DecimationPrecision::Low
    };
    config.mode = if cli.assumptions == "yes" {
        ArrangementMode::Consequential
    } else {
        ArrangementMode::Sequential
    };

    let objects = load_exported_objects(&cli.input_file)
        .with_context(|| format!("cannot load objects from {}", cli.input_file.display()))?;
    info!(objects = objects.len(), "objects loaded");

    let progress_bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(PROGRESS_RANGE as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] scheduling {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let plates = {
        let bar = &progress_bar;
        schedule_objects_for_sequential_print_with_progress(
            &config,
            &printer_geometry,
            &objects,
            |progress| bar.set_position(progress as u64),
        )?
    };
    progress_bar.finish_and_clear();

    let interactive = cli.interactive == "yes";
    let stdin = std::io::stdin();
    for (plate_index, plate) in plates.iter().enumerate() {
        let output_path = if interactive {
            cli.output_file.clone()
        } else {
            plate_suffixed_path(&cli.output_file, plate_index)
        };
        save_arrangement(&output_path, plate)
            .with_context(|| format!("cannot write {}", output_path.display()))?;
        info!(
            plate = plate_index,
            objects = plate.scheduled_objects.len(),
            path = %output_path.display(),
            "arrangement written"
        );
        if interactive && plate_index + 1 < plates.len() {
            eprintln!("Press ENTER to continue to the next plate ...");
            let mut line = String::new();
            let _ = stdin.lock().read_line(&mut line);
        }
    }

    Ok(plates)
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match run(&cli) {
        Ok(plates) => {
            let objects: usize = plates.iter().map(|p| p.scheduled_objects.len()).sum();
            info!(plates = plates.len(), objects, "sequential scheduling finished");
        }
        Err(err) => {
            error!("{err:#}");
            let code = match err.downcast_ref::<SeqArrangeError>() {
                Some(SeqArrangeError::ObjectTooLarge { .. }) => -1,
                Some(SeqArrangeError::SchedulingFailure) => -2,
                _ => -3,
            };
            std::process::exit(code);
        }
    }
}
