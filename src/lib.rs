//! Deterministic, coverage-aware subsetting of paired phospho/protein
//! differential-abundance outputs.
//!
//! One keep-set per dataset is chosen by the [`select`] layer and applied
//! consistently to the dataset's workbook, columnar table and annotation
//! table by the [`data`] layer. [`pipeline::run_subset`] sequences a run.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod select;
pub mod synthetic;

pub use config::{DatasetLayout, SubsetConfig};
pub use error::{Result, SubsetError};
pub use pipeline::{run_subset, RunReport};
