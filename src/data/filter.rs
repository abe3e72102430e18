use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::model::{Dataset, Record, Value};
use super::schema::{Role, SchemaMapping};

// ---------------------------------------------------------------------------
// Filter criteria: the user's selection per canonical role
// ---------------------------------------------------------------------------

/// One user-facing filter on a canonical role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterCriterion {
    /// Keep rows whose value is one of `allowed`. An empty set keeps everything.
    CategoricalSet { allowed: BTreeSet<Value> },
    /// Keep rows with `lower <= value <= upper`.
    NumericRange { lower: f64, upper: f64 },
}

/// Roles offered as categorical filters.
pub const CATEGORICAL_ROLES: [Role; 2] = [Role::Gender, Role::ParentEducation];

/// Roles offered as numeric range filters.
pub const RANGE_ROLES: [Role; 4] = [
    Role::Score,
    Role::StudyHours,
    Role::Attendance,
    Role::SleepHours,
];

/// Per-role filter state, replaced wholesale on each interaction.
pub type FilterState = BTreeMap<Role, FilterCriterion>;

/// Initialise a [`FilterState`] that matches every row: full category sets
/// and full observed ranges for each role the mapping binds.
pub fn init_filter_state(dataset: &Dataset, mapping: &SchemaMapping) -> FilterState {
    let mut state = FilterState::new();
    for role in CATEGORICAL_ROLES {
        if let Some(field) = mapping.field(role) {
            state.insert(
                role,
                FilterCriterion::CategoricalSet {
                    allowed: dataset.distinct(field),
                },
            );
        }
    }
    for role in RANGE_ROLES {
        let bounds = mapping.field(role).and_then(|f| dataset.numeric_bounds(f));
        if let Some((lower, upper)) = bounds {
            state.insert(role, FilterCriterion::NumericRange { lower, upper });
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Predicate: a conjunction of resolved clauses
// ---------------------------------------------------------------------------

/// A single resolved test against a concrete column.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    InSet { field: String, allowed: BTreeSet<Value> },
    Between { field: String, lower: f64, upper: f64 },
}

impl Clause {
    fn matches(&self, record: &Record) -> bool {
        match self {
            // Missing / null cells never satisfy an active clause.
            Clause::InSet { field, allowed } => record
                .get(field)
                .is_some_and(|v| !v.is_null() && allowed.contains(v)),
            Clause::Between {
                field,
                lower,
                upper,
            } => record
                .get(field)
                .and_then(Value::as_f64)
                .is_some_and(|v| *lower <= v && v <= *upper),
        }
    }
}

/// Row filter derived from a [`FilterState`]: the AND of its clauses.
/// An empty clause list matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// The predicate that keeps every row.
    pub fn match_all() -> Self {
        Predicate::default()
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        Predicate { clauses }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

/// Translate the filter state into a [`Predicate`].
///
/// A criterion contributes no clause when:
/// * its role is not bound by `mapping`
/// * it is a categorical set that is empty, or covers every observed value
/// * it is a range that spans the full observed range of the column
pub fn build_predicate(dataset: &Dataset, mapping: &SchemaMapping, filters: &FilterState) -> Predicate {
    let mut clauses = Vec::new();

    for (role, criterion) in filters {
        let Some(field) = mapping.field(*role) else {
            log::debug!("filter on unbound role `{role}` ignored");
            continue;
        };

        match criterion {
            FilterCriterion::CategoricalSet { allowed } => {
                if allowed.is_empty() {
                    continue;
                }
                let all_vals = dataset.distinct(field);
                if all_vals.is_subset(allowed) {
                    continue;
                }
                clauses.push(Clause::InSet {
                    field: field.to_string(),
                    allowed: allowed.clone(),
                });
            }
            FilterCriterion::NumericRange { lower, upper } => {
                if let Some((min, max)) = dataset.numeric_bounds(field) {
                    if *lower <= min && *upper >= max {
                        continue;
                    }
                }
                clauses.push(Clause::Between {
                    field: field.to_string(),
                    lower: *lower,
                    upper: *upper,
                });
            }
        }
    }

    Predicate { clauses }
}

/// Return indices of rows that pass `predicate`, in dataset order.
pub fn filtered_indices(dataset: &Dataset, predicate: &Predicate) -> Vec<usize> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| predicate.matches(row))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habits(rows: &[(&str, i64, f64, &str)]) -> (Dataset, SchemaMapping) {
        let columns: Vec<String> = [
            "student_id",
            "gender",
            "exam_score",
            "study_hours_per_day",
            "parental_education_level",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (g, score, hours, edu))| {
                let mut r = Record::new();
                r.insert("student_id".into(), Value::String(format!("S{i}")));
                r.insert("gender".into(), Value::String(g.to_string()));
                r.insert("exam_score".into(), Value::Integer(*score));
                r.insert("study_hours_per_day".into(), Value::Float(*hours));
                r.insert(
                    "parental_education_level".into(),
                    Value::String(edu.to_string()),
                );
                r
            })
            .collect();
        let ds = Dataset::from_rows(columns, records);
        let mapping = SchemaMapping::resolve(&ds).unwrap();
        (ds, mapping)
    }

    fn sample() -> (Dataset, SchemaMapping) {
        habits(&[
            ("Female", 85, 4.0, "Master"),
            ("Male", 40, 1.0, "High School"),
            ("Female", 95, 6.5, "Bachelor"),
            ("Male", 20, 0.5, "High School"),
            ("Other", 75, 3.0, "Bachelor"),
        ])
    }

    fn set(values: &[&str]) -> BTreeSet<Value> {
        values.iter().map(|v| Value::String(v.to_string())).collect()
    }

    #[test]
    fn default_state_matches_every_row() {
        let (ds, mapping) = sample();
        let state = init_filter_state(&ds, &mapping);
        assert!(state.contains_key(&Role::Gender));
        assert!(state.contains_key(&Role::StudyHours));
        assert!(!state.contains_key(&Role::Attendance));

        let predicate = build_predicate(&ds, &mapping, &state);
        assert!(predicate.is_match_all());
        assert_eq!(filtered_indices(&ds, &predicate).len(), 5);
    }

    #[test]
    fn empty_categorical_selection_equals_no_filter() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::Gender,
            FilterCriterion::CategoricalSet {
                allowed: BTreeSet::new(),
            },
        );
        let with_empty = filtered_indices(&ds, &build_predicate(&ds, &mapping, &state));
        let without = filtered_indices(&ds, &build_predicate(&ds, &mapping, &FilterState::new()));
        assert_eq!(with_empty, without);
        assert_eq!(with_empty.len(), 5);
    }

    #[test]
    fn categorical_subset_keeps_only_selected_values() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::Gender,
            FilterCriterion::CategoricalSet {
                allowed: set(&["Female"]),
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert_eq!(predicate.clauses().len(), 1);
        assert_eq!(filtered_indices(&ds, &predicate), vec![0, 2]);
    }

    #[test]
    fn range_is_inclusive_on_both_bounds() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::Score,
            FilterCriterion::NumericRange {
                lower: 40.0,
                upper: 85.0,
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert_eq!(filtered_indices(&ds, &predicate), vec![0, 1, 4]);
    }

    #[test]
    fn full_range_is_a_no_op() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::StudyHours,
            FilterCriterion::NumericRange {
                lower: 0.5,
                upper: 6.5,
            },
        );
        assert!(build_predicate(&ds, &mapping, &state).is_match_all());
    }

    #[test]
    fn criteria_compose_by_conjunction() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::ParentEducation,
            FilterCriterion::CategoricalSet {
                allowed: set(&["Bachelor", "High School"]),
            },
        );
        state.insert(
            Role::StudyHours,
            FilterCriterion::NumericRange {
                lower: 1.0,
                upper: 10.0,
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert_eq!(filtered_indices(&ds, &predicate), vec![1, 2, 4]);
    }

    #[test]
    fn unbound_role_degenerates_to_match_all() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::SleepHours,
            FilterCriterion::NumericRange {
                lower: 100.0,
                upper: 200.0,
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert!(predicate.is_match_all());
        assert_eq!(filtered_indices(&ds, &predicate).len(), 5);
    }

    #[test]
    fn disjoint_selection_yields_no_rows() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::Gender,
            FilterCriterion::CategoricalSet {
                allowed: set(&["Other"]),
            },
        );
        state.insert(
            Role::Score,
            FilterCriterion::NumericRange {
                lower: 90.0,
                upper: 100.0,
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert!(filtered_indices(&ds, &predicate).is_empty());
    }

    #[test]
    fn values_are_compared_not_interpolated() {
        let (ds, mapping) = sample();
        let mut state = FilterState::new();
        state.insert(
            Role::Gender,
            FilterCriterion::CategoricalSet {
                allowed: set(&["Female') OR 1=1 --"]),
            },
        );
        let predicate = build_predicate(&ds, &mapping, &state);
        assert!(filtered_indices(&ds, &predicate).is_empty());
    }
}
