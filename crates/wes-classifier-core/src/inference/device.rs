//! Compute device selection.

use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::info;
#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::warn;

/// Which device inference should run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// First available accelerator compiled in, else CPU.
    #[default]
    Auto,
    /// Always the CPU.
    Cpu,
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown device '{other}', expected 'auto' or 'cpu'")),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Cpu => f.write_str("cpu"),
        }
    }
}

/// Resolves a preference to a concrete device.
///
/// With [`DevicePreference::Auto`], Metal is tried first, then CUDA, when the
/// corresponding feature is enabled. Accelerator failures fall back to CPU.
#[must_use]
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        info!("Using CPU for inference (requested)");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device for inference");
                return device;
            }
            Err(e) => warn!("Metal unavailable: {e}"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA device for inference");
                return device;
            }
            Err(e) => warn!("CUDA unavailable: {e}"),
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}
