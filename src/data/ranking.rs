use std::cmp::Ordering;

use serde::Serialize;

use super::aggregate::Subset;
use super::model::{Dataset, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

/// A row extract: a column projection over selected rows, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Dataset index of each extracted row.
    pub source_rows: Vec<usize>,
}

impl Selection {
    /// Project `columns` out of `indices`. Missing cells become `Null`.
    pub fn project(dataset: &Dataset, indices: &[usize], columns: &[String]) -> Selection {
        let rows = indices
            .iter()
            .filter_map(|&i| dataset.row(i))
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Selection {
            columns: columns.to_vec(),
            rows,
            source_rows: indices.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Indices of the first `limit` rows of `subset` ordered by `sort_field`.
///
/// The sort is stable, so ties keep dataset order. Rows without a numeric
/// value sort last in either direction.
pub fn top_indices(subset: &Subset<'_>, sort_field: &str, direction: Direction, limit: usize) -> Vec<usize> {
    let dataset = subset.dataset();
    let key = |i: usize| dataset.row(i).and_then(|r| r.get(sort_field)).and_then(Value::as_f64);

    let mut indices = subset.indices().to_vec();
    indices.sort_by(|&a, &b| match (key(a), key(b)) {
        (Some(x), Some(y)) => match direction {
            Direction::Ascending => x.total_cmp(&y),
            Direction::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    indices.truncate(limit);
    indices
}

/// Top `limit` rows of `subset`, projected onto `columns`.
pub fn top_n(
    subset: &Subset<'_>,
    sort_field: &str,
    direction: Direction,
    limit: usize,
    columns: &[String],
) -> Selection {
    let indices = top_indices(subset, sort_field, direction, limit);
    Selection::project(subset.dataset(), &indices, columns)
}

/// Every row of `subset` with every dataset column, in dataset order.
pub fn extract(subset: &Subset<'_>) -> Selection {
    let dataset = subset.dataset();
    Selection::project(dataset, subset.indices(), dataset.column_names())
}
