//! One full recomputation: filter the dataset and derive every KPI and
//! chart table from the matching rows.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::data::aggregate::{
    linear_fit, BinStat, CorrelationStrength, GroupStat, HistogramBin, LinearFit, Metric, Subset,
};
use crate::data::filter::Predicate;
use crate::data::model::Dataset;
use crate::data::ranking::{top_n, Direction, Selection};
use crate::data::schema::{Role, SchemaMapping, SchemaVariant};
use crate::error::EngineError;

/// Whole-table figures shown before any filter applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub variant: SchemaVariant,
    pub rows: usize,
    pub columns: usize,
    pub mean_score: Metric,
    pub max_score: Metric,
}

impl Overview {
    pub fn compute(dataset: &Dataset, mapping: &SchemaMapping) -> Overview {
        let all = Subset::all(dataset);
        let (mean_score, max_score) = match mapping.field(Role::Score) {
            Some(score) => (
                Metric::from_option(all.mean(score)),
                Metric::from_option(all.max(score)),
            ),
            None => (Metric::Unavailable, Metric::Unavailable),
        };
        Overview {
            variant: mapping.variant(),
            rows: dataset.len(),
            columns: dataset.column_names().len(),
            mean_score,
            max_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub mean_score: Metric,
    pub max_score: Metric,
    /// Filtered mean score minus the unfiltered mean.
    pub score_delta_vs_global: Metric,
    /// Percentage of matching rows at or above the success threshold.
    pub success_rate: Metric,
    pub mean_study_hours: Metric,
    pub mean_attendance: Metric,
}

/// Correlation of study hours and score over the matching rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Correlation {
    Coefficient { r: f64, strength: CorrelationStrength },
    InsufficientData { pairs: usize },
}

/// Study hours vs score points with their trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter {
    pub points: Vec<[f64; 2]>,
    pub trend: Option<LinearFit>,
}

/// Everything the dashboard renders for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_rows: usize,
    pub matched_rows: usize,
    pub kpis: Kpis,
    pub score_histogram: Vec<HistogramBin>,
    pub study_vs_score: Scatter,
    pub by_gender: Vec<GroupStat>,
    /// `None` when the table has no attendance column.
    pub by_attendance: Option<Vec<BinStat>>,
    pub correlation: Correlation,
    pub top_performers: Selection,
}

impl Report {
    /// Run every aggregate against the rows `predicate` keeps.
    pub fn compute(
        dataset: &Dataset,
        mapping: &SchemaMapping,
        predicate: &Predicate,
        config: &EngineConfig,
    ) -> Result<Report, EngineError> {
        if dataset.is_empty() {
            return Err(EngineError::EmptyDataset);
        }
        let score = required(mapping, Role::Score)?;
        let gender = required(mapping, Role::Gender)?;
        let study = required(mapping, Role::StudyHours)?;

        let subset = Subset::new(dataset, predicate);
        log::debug!(
            "recomputed report: {} of {} rows match",
            subset.count(),
            dataset.len()
        );

        let mean_score = subset.mean(score);
        let global_mean = Subset::all(dataset).mean(score);
        let score_delta_vs_global = match (mean_score, global_mean) {
            (Some(m), Some(g)) => Metric::Value(m - g),
            _ => Metric::NoData,
        };

        let mean_attendance = match mapping.field(Role::Attendance) {
            Some(attendance) => Metric::from_option(subset.mean(attendance)),
            None => {
                log::warn!("no attendance column; attendance KPI skipped");
                Metric::Unavailable
            }
        };

        let kpis = Kpis {
            mean_score: Metric::from_option(mean_score),
            max_score: Metric::from_option(subset.max(score)),
            score_delta_vs_global,
            success_rate: Metric::from_option(
                subset.success_rate(score, config.success_threshold),
            ),
            mean_study_hours: Metric::from_option(subset.mean(study)),
            mean_attendance,
        };

        let by_attendance = mapping
            .field(Role::Attendance)
            .map(|attendance| subset.binned_mean(attendance, score, &config.attendance_bin_edges))
            .transpose()?;

        let points = subset.pairs(study, score);
        let trend = linear_fit(&points);

        let correlation = match subset.correlation(study, score) {
            Ok(r) => Correlation::Coefficient {
                r,
                strength: CorrelationStrength::classify(r),
            },
            Err(EngineError::InsufficientData { pairs }) => Correlation::InsufficientData { pairs },
            Err(other) => return Err(other),
        };

        let top_columns: Vec<String> = mapping
            .identifier()
            .into_iter()
            .chain([score, study])
            .chain(mapping.field(Role::Attendance))
            .map(str::to_string)
            .collect();

        Ok(Report {
            total_rows: dataset.len(),
            matched_rows: subset.count(),
            kpis,
            score_histogram: subset.histogram(score, config.histogram_bins),
            study_vs_score: Scatter { points, trend },
            by_gender: subset.grouped_mean(gender, score),
            by_attendance,
            correlation,
            top_performers: top_n(&subset, score, Direction::Descending, config.top_n, &top_columns),
        })
    }

    /// No row passed the filters. Not an error: every KPI reads "no data".
    pub fn is_empty(&self) -> bool {
        self.matched_rows == 0
    }
}

fn required(mapping: &SchemaMapping, role: Role) -> Result<&str, EngineError> {
    mapping
        .field(role)
        .ok_or(EngineError::MissingRequiredColumn(role))
}
