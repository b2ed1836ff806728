//! vcrop export engine.
//!
//! Turns a validated selection rectangle into an exported file: parity
//! correction for even-dimension encoders, the sequential frame loop with
//! bounded retry, per-frame progress, and cooperative cancellation.

pub mod parity;
pub mod pipeline;

pub use parity::correct_parity;
pub use pipeline::{
    export, run_job, run_job_in_background, CancelFlag, CropJob, ExportProgress, ExportSummary,
    ProgressCallback,
};
