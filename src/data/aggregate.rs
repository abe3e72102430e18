use std::collections::BTreeMap;

use serde::Serialize;

use super::filter::{filtered_indices, Predicate};
use super::model::{Dataset, Record, Value};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Metric – a KPI value or the reason it has none
// ---------------------------------------------------------------------------

/// A scalar KPI as handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Value(f64),
    /// The filtered subset has no usable values.
    NoData,
    /// The column backing this KPI is not in the dataset.
    Unavailable,
}

impl Metric {
    pub fn from_option(value: Option<f64>) -> Metric {
        value.map_or(Metric::NoData, Metric::Value)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::NoData | Metric::Unavailable => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate tables
// ---------------------------------------------------------------------------

/// Mean and count of the rows sharing one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: Value,
    pub mean: Option<f64>,
    pub count: usize,
}

/// One half-open bin `[lower, upper)`; open-ended at either extreme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinStat {
    pub label: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// `None` when no matching row fell into the bin.
    pub mean: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    StrongPositive,
    ModeratePositive,
    Weak,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> CorrelationStrength {
        if r > 0.5 {
            CorrelationStrength::StrongPositive
        } else if r > 0.3 {
            CorrelationStrength::ModeratePositive
        } else {
            CorrelationStrength::Weak
        }
    }
}

// ---------------------------------------------------------------------------
// Subset – the rows a predicate selects
// ---------------------------------------------------------------------------

/// The rows of a dataset that pass a predicate. Every aggregate is computed
/// against a subset, so the filter is evaluated once per recomputation.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> Subset<'a> {
    pub fn new(dataset: &'a Dataset, predicate: &Predicate) -> Self {
        Subset {
            dataset,
            indices: filtered_indices(dataset, predicate),
        }
    }

    /// The whole dataset, for global reference values.
    pub fn all(dataset: &'a Dataset) -> Self {
        Subset {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    /// Mean of the numeric cells of `field`; `None` when there are none.
    pub fn mean(&self, field: &str) -> Option<f64> {
        mean_of(self.numbers_of(field))
    }

    pub fn max(&self, field: &str) -> Option<f64> {
        self.numbers_of(field).reduce(f64::max)
    }

    /// Percentage of matching rows whose `field` is `>= threshold`.
    /// `None` when no row matches.
    pub fn success_rate(&self, field: &str, threshold: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let successes = self.numbers_of(field).filter(|v| *v >= threshold).count();
        Some(successes as f64 / self.count() as f64 * 100.0)
    }

    /// Mean of `value_field` per distinct value of `group_field`, sorted by key.
    pub fn grouped_mean(&self, group_field: &str, value_field: &str) -> Vec<GroupStat> {
        let mut groups: BTreeMap<Value, (usize, f64, usize)> = BTreeMap::new();
        for row in self.rows() {
            let key = row.get(group_field).cloned().unwrap_or(Value::Null);
            let entry = groups.entry(key).or_insert((0, 0.0, 0));
            entry.0 += 1;
            if let Some(v) = row.get(value_field).and_then(Value::as_f64) {
                entry.1 += v;
                entry.2 += 1;
            }
        }
        groups
            .into_iter()
            .map(|(key, (count, sum, n))| GroupStat {
                key,
                mean: (n > 0).then(|| sum / n as f64),
                count,
            })
            .collect()
    }

    /// Partition rows by `numeric_field` into half-open bins bounded by
    /// `edges` and average `value_field` in each. Every bin is reported, in
    /// ascending order, whether or not any row fell into it.
    pub fn binned_mean(
        &self,
        numeric_field: &str,
        value_field: &str,
        edges: &[f64],
    ) -> Result<Vec<BinStat>, EngineError> {
        validate_edges(edges)?;

        let mut acc = vec![(0usize, 0.0f64, 0usize); edges.len() + 1];
        for row in self.rows() {
            let Some(x) = row.get(numeric_field).and_then(Value::as_f64) else {
                continue;
            };
            let slot = &mut acc[edges.partition_point(|e| *e <= x)];
            slot.0 += 1;
            if let Some(v) = row.get(value_field).and_then(Value::as_f64) {
                slot.1 += v;
                slot.2 += 1;
            }
        }

        Ok(acc
            .into_iter()
            .enumerate()
            .map(|(i, (count, sum, n))| {
                let lower = i.checked_sub(1).map(|j| edges[j]);
                let upper = edges.get(i).copied();
                BinStat {
                    label: bin_label(lower, upper),
                    lower,
                    upper,
                    mean: (n > 0).then(|| sum / n as f64),
                    count,
                }
            })
            .collect())
    }

    /// Pearson correlation between two numeric columns over the rows where
    /// both are present.
    pub fn correlation(&self, field_a: &str, field_b: &str) -> Result<f64, EngineError> {
        pearson(&self.pairs(field_a, field_b))
    }

    /// `[a, b]` points for rows where both columns are numeric.
    pub fn pairs(&self, field_a: &str, field_b: &str) -> Vec<[f64; 2]> {
        self.rows()
            .filter_map(|r| {
                let a = r.get(field_a).and_then(Value::as_f64)?;
                let b = r.get(field_b).and_then(Value::as_f64)?;
                Some([a, b])
            })
            .collect()
    }

    /// Equal-width histogram between the min and max of `field`.
    pub fn histogram(&self, field: &str, bins: usize) -> Vec<HistogramBin> {
        let values: Vec<f64> = self.numbers_of(field).collect();
        let (Some(min), Some(max)) = (
            values.iter().copied().reduce(f64::min),
            values.iter().copied().reduce(f64::max),
        ) else {
            return Vec::new();
        };
        if bins == 0 {
            return Vec::new();
        }
        if max <= min {
            return vec![HistogramBin {
                lower: min,
                upper: max,
                count: values.len(),
            }];
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in values {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + width * i as f64,
                upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
                count,
            })
            .collect()
    }

    fn numbers_of<'f>(&'f self, field: &'f str) -> impl Iterator<Item = f64> + 'f {
        let rows = self.dataset.rows();
        self.indices
            .iter()
            .filter_map(move |&i| rows[i].get(field).and_then(Value::as_f64))
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Bin edges must be finite and strictly ascending.
pub fn validate_edges(edges: &[f64]) -> Result<(), EngineError> {
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(EngineError::InvalidConfig(format!(
            "bin edges must be finite, got {edges:?}"
        )));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(EngineError::InvalidConfig(format!(
            "bin edges must be strictly ascending, got {edges:?}"
        )));
    }
    Ok(())
}

fn bin_label(lower: Option<f64>, upper: Option<f64>) -> String {
    match (lower, upper) {
        (None, Some(hi)) => format!("< {hi}"),
        (Some(lo), Some(hi)) => format!("{lo}-{hi}"),
        (Some(lo), None) => format!(">= {lo}"),
        (None, None) => "all".to_string(),
    }
}

/// Pearson's r. Fewer than two points, a constant column or a non-finite
/// input has no defined coefficient.
pub fn pearson(points: &[[f64; 2]]) -> Result<f64, EngineError> {
    let n = points.len();
    if n < 2 {
        return Err(EngineError::InsufficientData { pairs: n });
    }
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for [x, y] in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(EngineError::InsufficientData { pairs: n });
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if !r.is_finite() {
        return Err(EngineError::InsufficientData { pairs: n });
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Least-squares trend line through `points`.
pub fn linear_fit(points: &[[f64; 2]]) -> Option<LinearFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for [x, y] in points {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Clause;

    fn table(scores: &[f64], genders: &[&str], attendance: &[f64]) -> Dataset {
        let rows = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r = Record::new();
                r.insert("score".into(), Value::Float(*s));
                if let Some(g) = genders.get(i) {
                    r.insert("gender".into(), Value::String(g.to_string()));
                }
                if let Some(a) = attendance.get(i) {
                    r.insert("attendance".into(), Value::Float(*a));
                }
                r
            })
            .collect();
        Dataset::from_rows(
            vec!["score".into(), "gender".into(), "attendance".into()],
            rows,
        )
    }

    fn nothing() -> Predicate {
        // A range no score can satisfy.
        Predicate::from_clauses(vec![Clause::Between {
            field: "score".into(),
            lower: 1000.0,
            upper: 2000.0,
        }])
    }

    #[test]
    fn mean_over_all_rows_is_arithmetic_mean() {
        let ds = table(&[50.0, 100.0, 60.0], &[], &[]);
        let all = Subset::all(&ds);
        assert_eq!(all.mean("score"), Some(70.0));
        assert_eq!(all.max("score"), Some(100.0));
    }

    #[test]
    fn success_rate_counts_threshold_inclusive() {
        let ds = table(&[100.0, 40.0, 70.0], &[], &[]);
        let rate = Subset::all(&ds).success_rate("score", 70.0).unwrap();
        assert!((rate - 66.666_666).abs() < 0.05);
    }

    #[test]
    fn grouped_mean_per_gender() {
        let ds = table(
            &[85.0, 40.0, 95.0, 20.0, 75.0],
            &["F", "M", "F", "M", "F"],
            &[],
        );
        let groups = Subset::all(&ds).grouped_mean("gender", "score");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, Value::String("F".into()));
        assert_eq!(groups[0].mean, Some(85.0));
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[1].key, Value::String("M".into()));
        assert_eq!(groups[1].mean, Some(30.0));
        assert_eq!(groups[1].count, 2);
    }

    #[test]
    fn bins_keep_order_and_report_empty_ones() {
        let ds = table(&[50.0, 70.0, 90.0, 80.0], &[], &[55.0, 72.0, 95.0, 90.0]);
        let bins = Subset::all(&ds)
            .binned_mean("attendance", "score", &[60.0, 70.0, 80.0, 90.0])
            .unwrap();
        let labels: Vec<_> = bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["< 60", "60-70", "70-80", "80-90", ">= 90"]);
        assert_eq!(bins[0].mean, Some(50.0));
        assert_eq!(bins[1].count, 0);
        assert_eq!(bins[1].mean, None);
        assert_eq!(bins[2].mean, Some(70.0));
        assert_eq!(bins[3].count, 0);
        assert_eq!(bins[4].count, 2);
        assert_eq!(bins[4].mean, Some(85.0));
    }

    #[test]
    fn bin_edges_must_ascend() {
        let ds = table(&[50.0], &[], &[55.0]);
        let err = Subset::all(&ds)
            .binned_mean("attendance", "score", &[70.0, 60.0])
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn self_correlation_is_one() {
        let ds = table(&[12.0, 40.0, 71.5, 33.0], &[], &[]);
        let r = Subset::all(&ds).correlation("score", "score").unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_column_has_no_self_correlation() {
        // Zero variance leaves r undefined, even against itself.
        let ds = table(&[70.0, 70.0, 70.0], &[], &[]);
        assert_eq!(
            Subset::all(&ds).correlation("score", "score"),
            Err(EngineError::InsufficientData { pairs: 3 })
        );
    }

    #[test]
    fn non_finite_cells_are_skipped_by_aggregates() {
        let ds = table(
            &[60.0, f64::NAN, 80.0, 90.0],
            &[],
            &[70.0, 75.0, f64::INFINITY, 95.0],
        );
        let all = Subset::all(&ds);
        assert_eq!(all.mean("score"), Some(230.0 / 3.0));
        assert_eq!(all.max("attendance"), Some(95.0));
        assert_eq!(all.pairs("score", "attendance"), vec![[60.0, 70.0], [90.0, 95.0]]);
        let r = all.correlation("score", "attendance").unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_never_returns_nan() {
        let points = [[1.0, 2.0], [f64::NAN, 3.0], [3.0, 5.0]];
        assert_eq!(pearson(&points), Err(EngineError::InsufficientData { pairs: 3 }));
        let points = [[1.0, 2.0], [f64::INFINITY, 3.0]];
        assert!(pearson(&points).is_err());
    }

    #[test]
    fn correlation_needs_two_rows() {
        let ds = table(&[12.0], &[], &[50.0]);
        assert_eq!(
            Subset::all(&ds).correlation("score", "attendance"),
            Err(EngineError::InsufficientData { pairs: 1 })
        );
    }

    #[test]
    fn perfectly_inverse_columns_correlate_to_minus_one() {
        let ds = table(&[1.0, 2.0, 3.0], &[], &[30.0, 20.0, 10.0]);
        let r = Subset::all(&ds).correlation("score", "attendance").unwrap();
        assert!((r + 1.0).abs() < 1e-9);
        assert_eq!(CorrelationStrength::classify(r), CorrelationStrength::Weak);
        assert_eq!(
            CorrelationStrength::classify(0.6),
            CorrelationStrength::StrongPositive
        );
        assert_eq!(
            CorrelationStrength::classify(0.4),
            CorrelationStrength::ModeratePositive
        );
    }

    #[test]
    fn empty_subset_reports_no_data_everywhere() {
        let ds = table(&[85.0, 40.0], &["F", "M"], &[90.0, 65.0]);
        let none = Subset::new(&ds, &nothing());
        assert_eq!(none.count(), 0);
        assert_eq!(none.mean("score"), None);
        assert_eq!(none.max("score"), None);
        assert_eq!(none.success_rate("score", 70.0), None);
        assert!(none.grouped_mean("gender", "score").is_empty());
        let bins = none
            .binned_mean("attendance", "score", &[60.0, 70.0, 80.0, 90.0])
            .unwrap();
        assert_eq!(bins.len(), 5);
        assert!(bins.iter().all(|b| b.count == 0 && b.mean.is_none()));
        assert!(none.histogram("score", 30).is_empty());
        assert!(matches!(
            none.correlation("score", "attendance"),
            Err(EngineError::InsufficientData { pairs: 0 })
        ));
    }

    #[test]
    fn histogram_covers_every_value() {
        let ds = table(&[0.0, 5.0, 10.0, 10.0], &[], &[]);
        let hist = Subset::all(&ds).histogram("score", 2);
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].count, 1);
        assert_eq!(hist[1].count, 3);
        assert_eq!(hist[1].upper, 10.0);

        let flat = table(&[7.0, 7.0], &[], &[]);
        let hist = Subset::all(&flat).histogram("score", 30);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].count, 2);
    }

    #[test]
    fn trend_line_through_exact_points() {
        let fit = linear_fit(&[[0.0, 1.0], [1.0, 3.0], [2.0, 5.0]]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.at(3.0) - 7.0).abs() < 1e-12);
        assert!(linear_fit(&[[1.0, 1.0], [1.0, 2.0]]).is_none());
    }

    #[test]
    fn metric_maps_missing_values_to_no_data() {
        assert_eq!(Metric::from_option(None), Metric::NoData);
        assert_eq!(Metric::from_option(Some(3.0)).value(), Some(3.0));
        assert_eq!(Metric::Unavailable.value(), None);
    }
}
