//! Conditions that stop the engine from producing KPIs for a dataset.

use thiserror::Error;

use crate::data::schema::Role;

/// Engine failure taxonomy.
///
/// An all-excluding filter is *not* listed here: aggregates report
/// [`Metric::NoData`](crate::data::aggregate::Metric::NoData) instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("the uploaded file is empty: it has a header but no data rows")]
    EmptyDataset,

    #[error(
        "unrecognized file format: expected a student habits or student performance factors table (columns found: {})",
        .columns.join(", ")
    )]
    UnrecognizedSchema { columns: Vec<String> },

    #[error("the table is missing the required `{0}` column")]
    MissingRequiredColumn(Role),

    #[error("not enough varied data to compute a correlation from {pairs} complete pair(s)")]
    InsufficientData { pairs: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
