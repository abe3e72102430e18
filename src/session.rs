use std::collections::BTreeSet;
use std::io::Write;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::data::aggregate::Subset;
use crate::data::export::write_csv;
use crate::data::filter::{build_predicate, init_filter_state, FilterCriterion, FilterState, Predicate};
use crate::data::model::{Dataset, Value};
use crate::data::ranking::{extract, Selection};
use crate::data::schema::{Role, SchemaMapping};
use crate::error::EngineError;
use crate::report::{Overview, Report};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One loaded dataset with its mapping and the user's current filters.
/// Dataset and mapping live and die together; only the filters change.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Dataset,
    mapping: SchemaMapping,
    filters: FilterState,
    config: EngineConfig,
}

impl Session {
    /// Resolve the schema of a freshly loaded dataset and start with
    /// filters that match every row.
    pub fn new(dataset: Dataset, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mapping = SchemaMapping::resolve(&dataset)?;
        let filters = init_filter_state(&dataset, &mapping);
        log::info!(
            "Loaded {} rows as {:?} ({} columns)",
            dataset.len(),
            mapping.variant(),
            dataset.column_names().len()
        );
        Ok(Session {
            dataset,
            mapping,
            filters,
            config,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn mapping(&self) -> &SchemaMapping {
        &self.mapping
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn overview(&self) -> Overview {
        Overview::compute(&self.dataset, &self.mapping)
    }

    /// Predicate for the current filters.
    pub fn predicate(&self) -> Predicate {
        build_predicate(&self.dataset, &self.mapping, &self.filters)
    }

    /// Recompute every KPI and chart table for the current filters.
    pub fn report(&self) -> Result<Report, EngineError> {
        Report::compute(&self.dataset, &self.mapping, &self.predicate(), &self.config)
    }

    /// All matching rows with every column, for display and export.
    pub fn filtered_extract(&self) -> Selection {
        let predicate = self.predicate();
        extract(&Subset::new(&self.dataset, &predicate))
    }

    /// Write the matching rows as CSV.
    pub fn export_csv<W: Write>(&self, output: W) -> Result<()> {
        write_csv(&self.filtered_extract(), output)
    }

    // -- filter mutations --

    /// Replace the whole filter state.
    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
    }

    /// Back to "match everything".
    pub fn reset_filters(&mut self) {
        self.filters = init_filter_state(&self.dataset, &self.mapping);
    }

    pub fn set_categorical(&mut self, role: Role, allowed: BTreeSet<Value>) {
        self.filters
            .insert(role, FilterCriterion::CategoricalSet { allowed });
    }

    pub fn set_range(&mut self, role: Role, lower: f64, upper: f64) {
        self.filters
            .insert(role, FilterCriterion::NumericRange { lower, upper });
    }

    /// Toggle a single value in a role's categorical selection.
    pub fn toggle_value(&mut self, role: Role, value: &Value) {
        let entry = self
            .filters
            .entry(role)
            .or_insert_with(|| FilterCriterion::CategoricalSet {
                allowed: BTreeSet::new(),
            });
        if let FilterCriterion::CategoricalSet { allowed } = entry {
            if !allowed.remove(value) {
                allowed.insert(value.clone());
            }
        }
    }

    /// Select every observed value of a role.
    pub fn select_all(&mut self, role: Role) {
        if let Some(field) = self.mapping.field(role) {
            let all_vals = self.dataset.distinct(field);
            self.set_categorical(role, all_vals);
        }
    }

    /// Clear a role's selection (which, by rule, filters nothing out).
    pub fn select_none(&mut self, role: Role) {
        self.set_categorical(role, BTreeSet::new());
    }

    /// Distinct values offered for a categorical role.
    pub fn options(&self, role: Role) -> BTreeSet<Value> {
        self.mapping
            .field(role)
            .map(|f| self.dataset.distinct(f))
            .unwrap_or_default()
    }

    /// Observed `(min, max)` for a numeric role.
    pub fn bounds(&self, role: Role) -> Option<(f64, f64)> {
        self.mapping
            .field(role)
            .and_then(|f| self.dataset.numeric_bounds(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv_reader;

    const CSV: &str = "\
student_id,gender,study_hours_per_day,attendance_percentage,sleep_hours,parental_education_level,exam_score
S1,Female,4.0,92.0,7.5,Master,85
S2,Male,1.0,58.0,6.0,High School,40
S3,Female,6.5,88.0,8.0,Bachelor,95
S4,Male,0.5,71.0,5.5,High School,20
S5,Female,3.0,65.0,7.0,Bachelor,75
";

    fn session() -> Session {
        let ds = load_csv_reader(CSV.as_bytes()).unwrap();
        Session::new(ds, EngineConfig::default()).unwrap()
    }

    #[test]
    fn toggle_then_select_all_restores_full_set() {
        let mut s = session();
        let male = Value::String("Male".into());
        s.toggle_value(Role::Gender, &male);
        assert_eq!(s.report().unwrap().matched_rows, 3);

        s.toggle_value(Role::Gender, &male);
        assert_eq!(s.report().unwrap().matched_rows, 5);

        s.select_none(Role::Gender);
        assert_eq!(s.report().unwrap().matched_rows, 5);

        s.select_all(Role::Gender);
        assert!(s.predicate().is_match_all());
    }

    #[test]
    fn reset_drops_every_restriction() {
        let mut s = session();
        s.set_range(Role::Score, 90.0, 100.0);
        assert_eq!(s.filtered_extract().len(), 1);
        s.reset_filters();
        assert_eq!(s.filtered_extract().len(), 5);
    }

    #[test]
    fn options_and_bounds_come_from_the_mapped_columns() {
        let s = session();
        assert_eq!(s.options(Role::ParentEducation).len(), 3);
        assert_eq!(s.bounds(Role::Attendance), Some((58.0, 92.0)));
        assert_eq!(s.bounds(Role::Gender), None);
    }

    #[test]
    fn session_keeps_the_config_it_was_built_with() {
        let ds = load_csv_reader(CSV.as_bytes()).unwrap();
        let config = EngineConfig {
            top_n: 2,
            ..EngineConfig::default()
        };
        let s = Session::new(ds, config.clone()).unwrap();
        assert_eq!(s.config(), &config);
        assert_eq!(s.report().unwrap().top_performers.len(), 2);
    }

    #[test]
    fn invalid_config_is_rejected_before_resolution() {
        let ds = load_csv_reader(CSV.as_bytes()).unwrap();
        let config = EngineConfig {
            attendance_bin_edges: vec![90.0, 60.0],
            ..EngineConfig::default()
        };
        assert!(matches!(
            Session::new(ds, config),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
