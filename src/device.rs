use std::fmt;
use std::process::Command;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{debug, error, warn};

/// The compute device a transcription run executes on.
///
/// Derived once per run from the user's preference plus a runtime availability
/// probe; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Device {
    /// NVIDIA GPU via CUDA.
    Cuda,
    /// Plain CPU inference.
    Cpu,
}

impl Device {
    pub fn is_cuda(self) -> bool {
        matches!(self, Self::Cuda)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Runtime availability probe for the accelerated device.
///
/// Kept as a trait so device selection stays testable on machines without any
/// GPU tooling installed.
pub trait AcceleratorProbe {
    fn is_available(&self) -> Result<bool>;
}

/// Probes CUDA availability by asking `nvidia-smi` to list devices.
///
/// A missing binary counts as a probe failure, not as "unavailable" — the
/// selector treats both the same way, but the log tells the user which it was.
pub struct NvidiaSmiProbe;

impl AcceleratorProbe for NvidiaSmiProbe {
    fn is_available(&self) -> Result<bool> {
        let output = Command::new("nvidia-smi")
            .arg("-L")
            .output()
            .context("failed to run nvidia-smi")?;

        Ok(output.status.success() && !output.stdout.is_empty())
    }
}

/// Resolve a requested device preference to an actually-usable device.
///
/// - No preference, or a CUDA preference, attempts the availability probe and
///   falls back to CPU when the probe reports unavailable or errors.
/// - An explicit CPU preference skips the probe entirely.
///
/// This never fails; the worst case is always `Device::Cpu`, so the pipeline
/// proceeds on any machine.
pub fn select_device(preference: Option<Device>, probe: &dyn AcceleratorProbe) -> Device {
    match preference {
        None | Some(Device::Cuda) => match probe.is_available() {
            Ok(true) => {
                debug!("CUDA available");
                Device::Cuda
            }
            Ok(false) => {
                warn!("CUDA not available, falling back to CPU");
                Device::Cpu
            }
            Err(err) => {
                error!("error checking CUDA availability: {err:#}");
                warn!("falling back to CPU");
                Device::Cpu
            }
        },
        Some(Device::Cpu) => Device::Cpu,
    }
}
