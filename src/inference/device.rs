//! Device selection shared by the classifier and generator engines

use crate::error::{DetectorError, Result};
use candle_core::{utils, Device};
use log::{debug, warn};

/// Explicit backend choice taken from the FAKE_NEWS_DEVICE environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Cuda,
    Metal,
    Cpu,
}

fn parse_backend(value: &str) -> Option<Backend> {
    match value.to_ascii_lowercase().as_str() {
        "cuda" | "gpu" => Some(Backend::Cuda),
        "metal" => Some(Backend::Metal),
        "cpu" => Some(Backend::Cpu),
        _ => None,
    }
}

/// Pick the device both engines run on. A FAKE_NEWS_DEVICE override wins and
/// fails if the requested backend cannot initialize; otherwise the best
/// available accelerator is used, falling back to CPU.
pub fn select_device() -> Result<Device> {
    if let Ok(requested) = std::env::var("FAKE_NEWS_DEVICE") {
        match parse_backend(&requested) {
            Some(Backend::Cuda) => {
                return Device::new_cuda(0).map_err(|e| {
                    DetectorError::ModelError(format!("CUDA requested but unavailable: {}", e))
                });
            }
            Some(Backend::Metal) => {
                return Device::new_metal(0).map_err(|e| {
                    DetectorError::ModelError(format!("Metal requested but unavailable: {}", e))
                });
            }
            Some(Backend::Cpu) => {
                debug!("Device pinned to CPU");
                return Ok(Device::Cpu);
            }
            None => {
                warn!(
                    "Unknown FAKE_NEWS_DEVICE value '{}', auto-detecting instead",
                    requested
                );
            }
        }
    }

    if utils::cuda_is_available() {
        let device = Device::new_cuda(0)?;
        debug!("Running on CUDA device 0");
        return Ok(device);
    }
    if utils::metal_is_available() {
        let device = Device::new_metal(0)?;
        debug!("Running on Metal device 0");
        return Ok(device);
    }
    debug!("No accelerator available, running on CPU");
    Ok(Device::Cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(parse_backend("cuda"), Some(Backend::Cuda));
        assert_eq!(parse_backend("GPU"), Some(Backend::Cuda));
        assert_eq!(parse_backend("Metal"), Some(Backend::Metal));
        assert_eq!(parse_backend("cpu"), Some(Backend::Cpu));
        assert_eq!(parse_backend("tpu"), None);
    }
}
