//! Executable resolution.
//!
//! All executables a run needs are located on the search path up front so a
//! missing tool aborts the run before any stage writes output.

use std::ffi::OsStr;
use std::path::PathBuf;

use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};

/// Decodes DDS back to PNG for metrics.
pub const NVDECOMPRESS: &str = "nvdecompress";
/// NVIDIA FLIP difference evaluator.
pub const FLIP: &str = "flip";
/// ImageMagick, used for PSNR, RMSE and SSIM.
pub const MAGICK: &str = "magick";

/// Resolved paths of the decode and metric tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTools {
    pub nvdecompress: PathBuf,
    pub flip: PathBuf,
    pub magick: PathBuf,
}

/// Resolved executables for one run.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    encoders: Vec<(Backend, PathBuf)>,
    metric_tools: Option<MetricTools>,
}

impl Toolchain {
    /// Build a toolchain from already resolved paths.
    pub fn new(encoders: Vec<(Backend, PathBuf)>, metric_tools: Option<MetricTools>) -> Self {
        Self {
            encoders,
            metric_tools,
        }
    }

    /// Resolve `backends` (and the metric tools when `with_metric_tools` is
    /// set) against `search_path`, a `PATH`-style list of directories.
    pub fn resolve(
        backends: &[Backend],
        with_metric_tools: bool,
        search_path: Option<&OsStr>,
    ) -> Result<Self> {
        let mut encoders = Vec::with_capacity(backends.len());
        for &backend in backends {
            let program = find_executable(backend.executable(), search_path).ok_or_else(|| {
                Error::MissingExecutable {
                    tool: backend.name().to_string(),
                    executable: backend.executable().to_string(),
                }
            })?;
            debug!(tool = backend.name(), program = %program.display(), "resolved encoder");
            encoders.push((backend, program));
        }

        let metric_tools = if with_metric_tools {
            let require = |name: &str| {
                find_executable(name, search_path).ok_or_else(|| Error::MissingExecutable {
                    tool: name.to_string(),
                    executable: name.to_string(),
                })
            };
            Some(MetricTools {
                nvdecompress: require(NVDECOMPRESS)?,
                flip: require(FLIP)?,
                magick: require(MAGICK)?,
            })
        } else {
            None
        };

        Ok(Self {
            encoders,
            metric_tools,
        })
    }

    /// Resolve against the process `PATH`.
    pub fn from_env(backends: &[Backend], with_metric_tools: bool) -> Result<Self> {
        let path = std::env::var_os("PATH");
        Self::resolve(backends, with_metric_tools, path.as_deref())
    }

    /// Selected encoders and their executables, in registry order.
    #[must_use]
    pub fn encoders(&self) -> &[(Backend, PathBuf)] {
        &self.encoders
    }

    /// Metric tools, if they were requested.
    #[must_use]
    pub fn metric_tools(&self) -> Option<&MetricTools> {
        self.metric_tools.as_ref()
    }
}

/// Look up `name` in each directory of `search_path`. On Windows the
/// extensions listed in `PATHEXT` are tried as well.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    let cwd = std::env::current_dir().unwrap_or_default();
    which::which_in(name, Some(search_path), cwd).ok()
}
