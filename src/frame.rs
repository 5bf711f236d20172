//! Tabular Dataset Module
//!
//! An in-memory, column-oriented table: an ordered list of named, typed
//! columns of equal length plus an optional row identifier column. Query
//! results are materialized into a `Frame`, and `write_frame` reads one to
//! generate DDL and bulk inserts.

use crate::core::{Result, SqlFrameError};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Text that looks like a plain decimal or scientific number literal.
static NUMERIC_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").unwrap()
});

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts numeric values and numeric-looking text to `Float`.
    fn to_float(&self) -> Option<Value> {
        match self {
            Value::Null => Some(Value::Null),
            Value::Integer(i) => Some(Value::Float(*i as f64)),
            Value::Float(f) => Some(Value::Float(*f)),
            Value::Text(s) if NUMERIC_TEXT.is_match(s) => {
                s.trim().parse::<f64>().ok().map(Value::Float)
            }
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Element type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    /// Text or mixed values
    Text,
    /// Floating point numbers
    Float,
    /// Integers
    Integer,
    /// Date and time of day
    DateTime,
    /// Calendar date without time of day
    Date,
    /// Date and time stored as integer nanoseconds since the Unix epoch
    EpochNanos,
}

impl DType {
    /// Any numeric storage, including the numeric datetime encoding.
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Float | DType::Integer | DType::EpochNanos)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, DType::Integer)
    }

    /// Any date/time representation, numeric or not.
    pub fn is_datetime(self) -> bool {
        matches!(self, DType::DateTime | DType::EpochNanos)
    }

    pub fn is_date(self) -> bool {
        matches!(self, DType::Date)
    }

    /// Infers the narrowest type holding every non-null value.
    pub fn infer(values: &[Value]) -> DType {
        let (mut ints, mut floats, mut dates, mut datetimes, mut other) =
            (false, false, false, false, false);

        for value in values {
            match value {
                Value::Null => {}
                Value::Integer(_) => ints = true,
                Value::Float(_) => floats = true,
                Value::Date(_) => dates = true,
                Value::DateTime(_) => datetimes = true,
                Value::Text(_) | Value::Blob(_) => other = true,
            }
        }

        let numeric = ints || floats;
        let temporal = dates || datetimes;
        if other || (numeric && temporal) {
            DType::Text
        } else if floats {
            DType::Float
        } else if ints {
            DType::Integer
        } else if datetimes {
            DType::DateTime
        } else if dates {
            DType::Date
        } else {
            DType::Text
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub dtype: DType,
    pub values: Vec<Value>,
}

impl Series {
    pub fn new(name: impl Into<String>, dtype: DType, values: Vec<Value>) -> Self {
        Series {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Creates a column whose type is inferred from its values
    pub fn infer(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = DType::infer(&values);
        Series::new(name, dtype, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Converts the column to `Float` when every non-null value is numeric or
    /// numeric-looking text. Returns the column unchanged otherwise.
    fn coerce_float(self) -> Self {
        let has_text = self.values.iter().any(|v| matches!(v, Value::Text(_)));
        if !has_text {
            return self;
        }
        let coerced: Option<Vec<Value>> = self.values.iter().map(Value::to_float).collect();
        match coerced {
            Some(values) => Series::new(self.name, DType::Float, values),
            None => self,
        }
    }
}

/// Column-oriented table with an optional row identifier
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<Series>,
    index: Option<Series>,
}

impl Frame {
    /// Builds a frame from columns of equal length
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(ragged) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(SqlFrameError::Frame(format!(
                    "column '{}' has {} values, expected {}",
                    ragged.name,
                    ragged.len(),
                    first.len()
                )));
            }
        }
        Ok(Frame {
            columns,
            index: None,
        })
    }

    /// Materializes row tuples into a frame.
    ///
    /// Column types are inferred from the values. With `coerce_float`,
    /// columns holding numeric-looking text become `Float` columns.
    pub fn from_records(rows: Vec<Vec<Value>>, columns: Vec<String>, coerce_float: bool) -> Result<Self> {
        let width = columns.len();
        let mut data: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(SqlFrameError::Frame(format!(
                    "row {} has {} fields, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            for (column, value) in data.iter_mut().zip(row) {
                column.push(value);
            }
        }

        let series = columns
            .into_iter()
            .zip(data)
            .map(|(name, values)| {
                let series = Series::infer(name, values);
                if coerce_float {
                    series.coerce_float()
                } else {
                    series
                }
            })
            .collect();

        Frame::new(series)
    }

    /// Moves the named column out of the ordinary columns and makes it the
    /// row identifier.
    pub fn set_index(mut self, name: &str) -> Result<Self> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SqlFrameError::Frame(format!("no column named '{}'", name)))?;
        self.index = Some(self.columns.remove(position));
        Ok(self)
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row identifier column, if one was set
    pub fn index(&self) -> Option<&Series> {
        self.index.as_ref()
    }

    /// Number of columns, excluding the index
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns
            .first()
            .or(self.index.as_ref())
            .map(Series::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over rows in column order, excluding the index
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.len()).map(move |i| self.columns.iter().map(|c| c.values[i].clone()).collect())
    }

    /// Renders the frame as a JSON array of records, index column first.
    pub fn to_json_records(&self) -> Result<serde_json::Value> {
        let all: Vec<&Series> = self.index.iter().chain(self.columns.iter()).collect();
        let mut records = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let mut record = serde_json::Map::new();
            for series in &all {
                record.insert(series.name.clone(), serde_json::to_value(&series.values[i])?);
            }
            records.push(serde_json::Value::Object(record));
        }
        Ok(serde_json::Value::Array(records))
    }
}
