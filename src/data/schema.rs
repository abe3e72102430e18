use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::model::Dataset;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Canonical roles
// ---------------------------------------------------------------------------

/// The student-data concepts both supported tables express under
/// different column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Score,
    Gender,
    StudyHours,
    Attendance,
    SleepHours,
    ParentEducation,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Score,
        Role::Gender,
        Role::StudyHours,
        Role::Attendance,
        Role::SleepHours,
        Role::ParentEducation,
    ];

    /// Roles every KPI computation depends on.
    pub const REQUIRED: [Role; 3] = [Role::Score, Role::Gender, Role::StudyHours];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Score => "score",
            Role::Gender => "gender",
            Role::StudyHours => "study_hours",
            Role::Attendance => "attendance",
            Role::SleepHours => "sleep_hours",
            Role::ParentEducation => "parent_education",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Supported variants
// ---------------------------------------------------------------------------

/// The two recognised table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// "Student Habits vs Academic Performance": snake_case columns keyed by `student_id`.
    Habits,
    /// "Student Performance Factors": Capitalised columns, no identifier.
    Factors,
}

impl SchemaVariant {
    /// Column whose presence identifies the variant.
    pub fn signature(self) -> &'static str {
        match self {
            SchemaVariant::Habits => "student_id",
            SchemaVariant::Factors => "Hours_Studied",
        }
    }

    /// Concrete column name for a role in this variant.
    pub fn column(self, role: Role) -> &'static str {
        match (self, role) {
            (SchemaVariant::Habits, Role::Score) => "exam_score",
            (SchemaVariant::Habits, Role::Gender) => "gender",
            (SchemaVariant::Habits, Role::StudyHours) => "study_hours_per_day",
            (SchemaVariant::Habits, Role::Attendance) => "attendance_percentage",
            (SchemaVariant::Habits, Role::SleepHours) => "sleep_hours",
            (SchemaVariant::Habits, Role::ParentEducation) => "parental_education_level",
            (SchemaVariant::Factors, Role::Score) => "Exam_Score",
            (SchemaVariant::Factors, Role::Gender) => "Gender",
            (SchemaVariant::Factors, Role::StudyHours) => "Hours_Studied",
            (SchemaVariant::Factors, Role::Attendance) => "Attendance",
            (SchemaVariant::Factors, Role::SleepHours) => "Sleep_Hours",
            (SchemaVariant::Factors, Role::ParentEducation) => "Parental_Education_Level",
        }
    }

    /// Identifier column, if the variant has one.
    pub fn identifier(self) -> Option<&'static str> {
        match self {
            SchemaVariant::Habits => Some("student_id"),
            SchemaVariant::Factors => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SchemaVariant::Habits => "Student Habits vs Performance",
            SchemaVariant::Factors => "Student Performance Factors",
        }
    }

    /// Classify a dataset by its column set. `student_id` wins when both
    /// signatures are present.
    pub fn detect(dataset: &Dataset) -> Option<SchemaVariant> {
        [SchemaVariant::Habits, SchemaVariant::Factors]
            .into_iter()
            .find(|v| dataset.has_column(v.signature()))
    }
}

// ---------------------------------------------------------------------------
// SchemaMapping
// ---------------------------------------------------------------------------

/// Role → column binding for one loaded dataset. Only columns that actually
/// exist in the dataset are bound, so a lookup never names a missing column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaMapping {
    variant: SchemaVariant,
    fields: BTreeMap<Role, String>,
    identifier: Option<String>,
}

impl SchemaMapping {
    /// Detect the variant of `dataset` and bind its columns.
    pub fn resolve(dataset: &Dataset) -> Result<SchemaMapping, EngineError> {
        if dataset.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let variant =
            SchemaVariant::detect(dataset).ok_or_else(|| EngineError::UnrecognizedSchema {
                columns: dataset.column_names().to_vec(),
            })?;

        let fields: BTreeMap<Role, String> = Role::ALL
            .into_iter()
            .map(|role| (role, variant.column(role)))
            .filter(|(_, col)| dataset.has_column(col))
            .map(|(role, col)| (role, col.to_string()))
            .collect();

        if let Some(missing) = Role::REQUIRED
            .into_iter()
            .find(|role| !fields.contains_key(role))
        {
            return Err(EngineError::MissingRequiredColumn(missing));
        }

        let identifier = variant
            .identifier()
            .filter(|id| dataset.has_column(id))
            .map(str::to_string);

        Ok(SchemaMapping {
            variant,
            fields,
            identifier,
        })
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Column bound to `role`, or `None` when the dataset lacks it.
    pub fn field(&self, role: Role) -> Option<&str> {
        self.fields.get(&role).map(String::as_str)
    }

    pub fn has(&self, role: Role) -> bool {
        self.fields.contains_key(&role)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Record, Value};

    fn dataset(columns: &[&str]) -> Dataset {
        let row: Record = columns
            .iter()
            .map(|c| (c.to_string(), Value::Integer(1)))
            .collect();
        Dataset::from_rows(columns.iter().map(|c| c.to_string()).collect(), vec![row])
    }

    const HABITS: &[&str] = &[
        "student_id",
        "gender",
        "study_hours_per_day",
        "sleep_hours",
        "attendance_percentage",
        "parental_education_level",
        "exam_score",
    ];

    const FACTORS: &[&str] = &[
        "Hours_Studied",
        "Attendance",
        "Parental_Education_Level",
        "Sleep_Hours",
        "Gender",
        "Exam_Score",
    ];

    #[test]
    fn habits_signature_classifies_as_habits() {
        let mapping = SchemaMapping::resolve(&dataset(HABITS)).unwrap();
        assert_eq!(mapping.variant(), SchemaVariant::Habits);
        assert_eq!(mapping.field(Role::Score), Some("exam_score"));
        assert_eq!(mapping.field(Role::StudyHours), Some("study_hours_per_day"));
        assert_eq!(
            mapping.field(Role::ParentEducation),
            Some("parental_education_level")
        );
        assert_eq!(mapping.identifier(), Some("student_id"));
    }

    #[test]
    fn factors_signature_classifies_as_factors() {
        let mapping = SchemaMapping::resolve(&dataset(FACTORS)).unwrap();
        assert_eq!(mapping.variant(), SchemaVariant::Factors);
        assert_eq!(mapping.field(Role::Score), Some("Exam_Score"));
        assert_eq!(mapping.field(Role::Attendance), Some("Attendance"));
        assert_eq!(mapping.field(Role::SleepHours), Some("Sleep_Hours"));
        assert_eq!(mapping.identifier(), None);
    }

    #[test]
    fn neither_signature_is_unrecognized() {
        let err = SchemaMapping::resolve(&dataset(&["exam_score", "gender"])).unwrap_err();
        assert!(matches!(err, EngineError::UnrecognizedSchema { .. }));
    }

    #[test]
    fn empty_dataset_is_reported_before_detection() {
        let ds = Dataset::from_rows(HABITS.iter().map(|c| c.to_string()).collect(), Vec::new());
        assert_eq!(SchemaMapping::resolve(&ds), Err(EngineError::EmptyDataset));
    }

    #[test]
    fn signature_match_still_requires_kpi_columns() {
        let err = SchemaMapping::resolve(&dataset(&["Hours_Studied", "Exam_Score"])).unwrap_err();
        assert_eq!(err, EngineError::MissingRequiredColumn(Role::Gender));
    }

    #[test]
    fn optional_roles_left_unbound_when_absent() {
        let mapping =
            SchemaMapping::resolve(&dataset(&["student_id", "exam_score", "gender", "study_hours_per_day"]))
                .unwrap();
        assert!(!mapping.has(Role::Attendance));
        assert_eq!(mapping.field(Role::SleepHours), None);
    }
}
