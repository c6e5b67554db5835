use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use layer_export_lib::services::config::{load_settings, ExportSettings};
use layer_export_lib::services::export::{run, LogProgress, RunOutcome};
use layer_export_lib::services::host::raster::{RasterDocument, RasterHost, RasterLayerId};
use layer_export_lib::services::host::RunMode;
use layer_export_lib::services::overwrite::{FixedChooser, OverwriteMode, PromptChooser};

#[derive(Parser, Debug)]
#[command(
    name = "layer-export",
    version,
    about = "Export every layer of a layered image as its own file"
)]
struct Cli {
    /// Directory holding the layers: sub-directories are groups, images are layers
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,
    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Default file extension, e.g. png
    #[arg(long, value_name = "EXT")]
    extension: Option<String>,
    /// What to do with files that already exist (default: from settings)
    #[arg(long, value_enum)]
    overwrite: Option<OverwriteArg>,
    /// Let encoders ask for their options
    #[arg(long)]
    interactive: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OverwriteArg {
    Ask,
    Replace,
    Skip,
    RenameNew,
    RenameExisting,
    Cancel,
}

impl OverwriteArg {
    fn fixed_mode(self) -> Option<OverwriteMode> {
        match self {
            OverwriteArg::Ask => None,
            OverwriteArg::Replace => Some(OverwriteMode::Replace),
            OverwriteArg::Skip => Some(OverwriteMode::Skip),
            OverwriteArg::RenameNew => Some(OverwriteMode::RenameNew),
            OverwriteArg::RenameExisting => Some(OverwriteMode::RenameExisting),
            OverwriteArg::Cancel => Some(OverwriteMode::Cancel),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match export(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn export(cli: Cli) -> Result<()> {
    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => ExportSettings::default(),
    };
    if let Some(output) = cli.output {
        settings.output_directory = output;
    }
    if let Some(extension) = cli.extension {
        settings.file_extension = extension;
    }

    let document = RasterDocument::from_directory(&cli.input)
        .with_context(|| format!("failed to load layers from {}", cli.input.display()))?;
    let mut host = RasterHost::new(document);

    let run_mode = if cli.interactive {
        RunMode::Interactive
    } else {
        RunMode::NonInteractive
    };
    let mut progress = LogProgress::new();

    let fixed = match cli.overwrite {
        Some(arg) => arg.fixed_mode(),
        None => Some(settings.overwrite_mode),
    };
    let outcome: RunOutcome<RasterLayerId> = match fixed {
        Some(mode) => run(run_mode, &mut host, &settings, &mut FixedChooser(mode), &mut progress),
        None => {
            let stdin = io::stdin();
            let mut chooser = PromptChooser::new(stdin.lock(), io::stderr());
            run(run_mode, &mut host, &settings, &mut chooser, &mut progress)
        }
    };

    println!(
        "Exported {} layer(s), skipped {}",
        outcome.exported().len(),
        outcome.skipped().len()
    );
    outcome.result?;
    Ok(())
}
