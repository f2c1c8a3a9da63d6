//! # dds-eval
//!
//! Harness for comparing BC7 DDS texture encoders, plus two small helpers
//! for the texture pipeline around it.
//!
//! The encoders themselves are external programs (`bc7enc`,
//! `nvbatchcompress`, `png2dds`, `texconv`). This crate locates them, runs
//! them over a directory of PNG files, and reports timing, size, and
//! image quality as CSV tables. Quality is measured with NVIDIA FLIP and
//! ImageMagick after decoding the DDS output back to PNG with
//! `nvdecompress`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dds_eval::{Backend, CompareConfig, Stages, compare};
//!
//! let config = CompareConfig::new("textures", "out")
//!     .with_backends([Backend::Png2dds, Backend::Texconv])
//!     .with_stages(Stages { files: true, ..Stages::default() });
//!
//! let toolchain = compare::prepare(&config, std::env::var_os("PATH").as_deref())?;
//! compare::run(&config, &toolchain, &mut std::io::stdout().lock())?;
//! # Ok::<(), dds_eval::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`backend`]: The encoder registry
//! - [`toolchain`]: Executable lookup on the search path
//! - [`process`]: Child process helpers and exit code policy
//! - [`runner`]: Timed batch and per-file encoder runs
//! - [`metrics`]: FLIP and ImageMagick quality scores
//! - [`probe`]: Host and tool identification
//! - [`report`]: CSV tables
//! - [`compare`]: The comparison driver
//! - [`flatten`]: Collect PNGs from a tree into one folder
//! - [`release`]: Fetch ISPC and Ninja from GitHub releases

pub mod backend;
pub mod compare;
pub mod error;
pub mod flatten;
pub mod metrics;
pub mod probe;
pub mod process;
pub mod release;
pub mod report;
pub mod runner;
pub mod toolchain;

pub use backend::{Backend, BackendSpec};
pub use compare::{CompareConfig, Stages};
pub use error::{Error, Result};
pub use flatten::{FlattenSummary, flatten};
pub use metrics::{MetricRow, MetricScores};
pub use process::{ExitPolicy, Outcome};
pub use release::{FetchRequest, Platform, ReleaseTool, fetch};
pub use runner::RunOptions;
pub use toolchain::{MetricTools, Toolchain};
