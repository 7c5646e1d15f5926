use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

use subgen::batch::{BatchReport, BatchRunner};
use subgen::device::{Device, NvidiaSmiProbe, select_device};
use subgen::discover::discover;
use subgen::engines::whisper::{WhisperEngine, WhisperModel};
use subgen::logging::{self, LogLevel};
use subgen::progress::SpinnerReporter;

#[derive(Parser, Debug)]
#[command(name = "subgen")]
#[command(version, about = "Generate SubRip subtitles for media files using Whisper")]
struct Params {
    /// Path to a single input media file.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Directory to search recursively for media files.
    #[arg(short = 'd', long = "directory")]
    directory: Option<PathBuf>,

    /// Compute device; CUDA availability is probed when this is omitted.
    #[arg(short = 'c', long = "compute-device", value_enum, ignore_case = true)]
    compute_device: Option<Device>,

    /// Whisper model size to transcribe with.
    #[arg(
        short = 'm',
        long = "model-size",
        value_enum,
        default_value_t = WhisperModel::BaseEn
    )]
    model_size: WhisperModel,

    /// Directory holding the ggml model files.
    #[arg(long = "model-dir", default_value = "models")]
    model_dir: PathBuf,

    /// Console log level (the run log file always records errors).
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Error
    )]
    log_level: LogLevel,
}

fn main() -> ExitCode {
    // Invoked bare: show usage instead of silently doing nothing.
    if std::env::args_os().len() <= 1 {
        let _ = Params::command().print_help();
        return ExitCode::FAILURE;
    }

    let params = Params::parse();

    if let Err(err) = logging::init(params.log_level, Path::new("logs")) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(params: Params) -> Result<()> {
    if let Some(dir) = &params.directory {
        if !dir.is_dir() {
            anyhow::bail!("directory '{}' does not exist", dir.display());
        }
    }
    if let Some(file) = &params.file {
        if !file.is_file() {
            anyhow::bail!("file '{}' does not exist", file.display());
        }
    }

    let candidates = discover(params.directory.as_deref(), params.file.as_deref())?;

    let device = select_device(params.compute_device, &NvidiaSmiProbe);
    info!("using device: {device}");

    let model_path = params.model_size.resolve_in(&params.model_dir);
    let mut engine = WhisperEngine::load(&model_path, device)?;
    let mut progress = SpinnerReporter::new();

    let report = BatchRunner::new(&mut engine, &mut progress).run(&candidates);
    print_summary(&report);

    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("Processing times:");
    for lap in &report.timings {
        println!("  {:<32} {:>9.2}s", lap.label, lap.total.as_secs_f64());
    }
    println!();
    println!(
        "{} subtitle file(s) written, {} failed",
        report.written_count(),
        report.failed_count()
    );
}
