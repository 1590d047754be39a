pub mod borehole;
pub mod calendar;
pub mod config;
pub mod daily;
pub mod deformation;
pub mod error;
pub mod frame;
pub mod gap_fill;
pub mod meteo;
pub mod output;
pub mod pipelines;

pub use config::MurtelConfig;
pub use error::{PipelineError, Result};
pub use output::OutputSummary;
pub use pipelines::{inspect_file, run_all, run_job, FileInspection, Job};
