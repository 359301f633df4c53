//! Core engine for dbquality.
//!
//! This crate loads tables from a relational source into memory and runs
//! data-quality checks on them: column profiling, expectation inference,
//! validation against saved expectation suites, and outlier detection.
//!
//! # Security Guarantees
//! - Sources are opened read-only
//! - Connection strings are redacted in every error and log line
//! - No credentials are kept in configuration or summary structures
//!
//! # Architecture
//! - [`adapters`]: tabular sources behind the `TabularSource` trait
//! - [`quality`]: pure functions over [`Dataset`] values
//! - [`report`] and [`persistence`]: artifact sinks under one [`persistence::ReportDir`]
//! - [`runner`]: the per-table pipeline and cross-table [`summary`]

pub mod adapters;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod quality;
pub mod report;
pub mod runner;
pub mod summary;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, SourceType, TabularSource, create_source};
pub use error::{DbQualityError, Result};
pub use models::{CellValue, Column, ColumnType, DataKind, Dataset};
pub use persistence::ReportDir;
pub use quality::{
    Expectation, ExpectationSuite, OutlierMethod, OutlierReport, QualityCheckConfig,
    ValidationResult,
};
pub use runner::{QualityCheckRunner, RunReport, TableOutcome};
pub use summary::QualityCheckSummary;
