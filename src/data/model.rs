use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Value – a single cell of the student table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Categorical selections live in `BTreeSet`s, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` for numeric aggregation. Non-finite
    /// floats count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text written into a delimited export cell.
    ///
    /// Floats use the shortest representation that parses back to the same
    /// bits and always keep a decimal point, so `72.0` stays a float.
    pub fn to_field(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(v) => format!("{v:?}"),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// One student row: column_name → value.
pub type Record = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Record>,
    /// Column names in header order.
    column_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset from rows and the header they were read with.
    ///
    /// Columns that only show up in the rows (JSON input without a header)
    /// are appended after the given ones.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Record>) -> Self {
        let mut seen: BTreeSet<String> = column_names.iter().cloned().collect();
        let mut column_names = column_names;
        for row in &rows {
            for col in row.keys() {
                if seen.insert(col.clone()) {
                    column_names.push(col.clone());
                }
            }
        }
        Dataset { rows, column_names }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted distinct non-null values of a column.
    pub fn distinct(&self, field: &str) -> BTreeSet<Value> {
        self.rows
            .iter()
            .filter_map(|r| r.get(field))
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }

    /// Observed `(min, max)` over the numeric cells of a column.
    pub fn numeric_bounds(&self, field: &str) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.get(field).and_then(Value::as_f64))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn non_finite_floats_are_not_numbers() {
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_f64(), None);
        assert_eq!(Value::Float(f64::NEG_INFINITY).as_f64(), None);
    }

    #[test]
    fn mixed_numeric_kinds_order_by_kind_then_value() {
        let mut set = BTreeSet::new();
        set.insert(Value::String("b".into()));
        set.insert(Value::Integer(3));
        set.insert(Value::Null);
        set.insert(Value::String("a".into()));
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                Value::Null,
                Value::Integer(3),
                Value::String("a".into()),
                Value::String("b".into()),
            ]
        );
    }

    #[test]
    fn float_fields_keep_their_decimal_point() {
        assert_eq!(Value::Float(72.0).to_field(), "72.0");
        assert_eq!(Value::Float(0.1).to_field(), "0.1");
        assert_eq!(Value::Null.to_field(), "");
    }

    #[test]
    fn distinct_skips_nulls_and_bounds_skip_text() {
        let ds = Dataset::from_rows(
            vec!["g".into(), "x".into()],
            vec![
                row(&[("g", Value::String("F".into())), ("x", Value::Integer(4))]),
                row(&[("g", Value::Null), ("x", Value::String("n/a".into()))]),
                row(&[("g", Value::String("M".into())), ("x", Value::Float(1.5))]),
                row(&[("g", Value::String("F".into())), ("x", Value::Integer(9))]),
            ],
        );
        let genders: Vec<_> = ds.distinct("g").into_iter().collect();
        assert_eq!(
            genders,
            vec![Value::String("F".into()), Value::String("M".into())]
        );
        assert_eq!(ds.numeric_bounds("x"), Some((1.5, 9.0)));
        assert_eq!(ds.numeric_bounds("missing"), None);
    }

    #[test]
    fn columns_only_seen_in_rows_are_appended() {
        let ds = Dataset::from_rows(
            vec!["a".into()],
            vec![row(&[("a", Value::Integer(1)), ("b", Value::Integer(2))])],
        );
        assert_eq!(ds.column_names(), &["a".to_string(), "b".to_string()]);
        assert!(ds.has_column("b"));
    }
}
