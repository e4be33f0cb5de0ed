use crate::error::ChartError;
use serde_json::{Map, Value};
use std::fmt;

/// Cell values that read as missing data in CSV input
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single value in the table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Bool(_) | Cell::Int(_) | Cell::Float(_))
    }

    /// Numeric view of the cell (bools count as 0/1)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Null | Cell::Text(_) => None,
        }
    }

    /// Convert a JSON scalar into a cell
    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// JSON encoding used by the table-schema output; NaN and infinities become null
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(true) => write!(f, "True"),
            Cell::Bool(false) => write!(f, "False"),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Column dtype as reported in the table schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Number,
    Boolean,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
        }
    }
}

/// In-memory tabular dataset: named columns, aligned rows and a row label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub index: Vec<usize>,
}

impl Table {
    /// Build a table with index labels `0..rows.len()`.
    ///
    /// Short rows are padded with nulls. Numeric columns that mix ints and
    /// floats are stored as floats.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let index = (0..rows.len()).collect();
        Self::with_index(headers, rows, index)
    }

    pub fn with_index(headers: Vec<String>, mut rows: Vec<Vec<Cell>>, index: Vec<usize>) -> Self {
        let width = headers.len();
        for row in &mut rows {
            row.resize(width, Cell::Null);
        }
        let mut table = Self { headers, rows, index };
        table.promote_mixed_numeric();
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All cells of one column, in row order
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    pub fn column_type(&self, idx: usize) -> ColumnType {
        let mut has_null = false;
        let (mut ints, mut floats, mut bools, mut other) = (0, 0, 0, 0);
        for cell in self.column(idx) {
            match cell {
                Cell::Null => has_null = true,
                Cell::Int(_) => ints += 1,
                Cell::Float(_) => floats += 1,
                Cell::Bool(_) => bools += 1,
                Cell::Text(_) => other += 1,
            }
        }

        if other > 0 || (ints + floats > 0 && bools > 0) || ints + floats + bools == 0 {
            ColumnType::String
        } else if bools > 0 {
            if has_null {
                ColumnType::String
            } else {
                ColumnType::Boolean
            }
        } else if floats > 0 || has_null {
            ColumnType::Number
        } else {
            ColumnType::Integer
        }
    }

    fn promote_mixed_numeric(&mut self) {
        for idx in 0..self.headers.len() {
            let has_float = self.column(idx).any(|c| matches!(c, Cell::Float(_)));
            let only_numbers = self
                .column(idx)
                .all(|c| matches!(c, Cell::Null | Cell::Int(_) | Cell::Float(_)));
            if has_float && only_numbers {
                for row in &mut self.rows {
                    if let Cell::Int(i) = row[idx] {
                        row[idx] = Cell::Float(i as f64);
                    }
                }
            }
        }
    }

    /// Parse CSV text with a header row, inferring a type per column
    pub fn from_csv(text: &str) -> Result<Self, ChartError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ChartError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ChartError::Parse("CSV input has no header row".to_string()));
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ChartError::Parse(e.to_string()))?;
            if record.len() > headers.len() {
                return Err(ChartError::Parse(format!(
                    "expected {} fields in row {}, saw {}",
                    headers.len(),
                    line + 1,
                    record.len()
                )));
            }
            raw_rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        let mut rows: Vec<Vec<Cell>> = vec![Vec::with_capacity(headers.len()); raw_rows.len()];
        for col in 0..headers.len() {
            let values: Vec<Option<&str>> = raw_rows
                .iter()
                .map(|r| r.get(col).map(String::as_str).filter(|v| !MISSING_MARKERS.contains(v)))
                .collect();
            for (row, cell) in rows.iter_mut().zip(infer_column(&values)) {
                row.push(cell);
            }
        }

        Ok(Self::new(headers, rows))
    }

    /// Parse JSON in records, columns or table-schema shape
    pub fn from_json(text: &str) -> Result<Self, ChartError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ChartError::Parse(e.to_string()))?;

        match &value {
            Value::Array(items) => Self::from_records(items),
            Value::Object(obj) => match (obj.get("schema"), obj.get("data")) {
                (Some(schema), Some(Value::Array(items))) => {
                    let mut table = Self::from_records(items)?;
                    let keys = schema
                        .get("primaryKey")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    for key in keys.iter().filter_map(Value::as_str) {
                        table.drop_column(key);
                    }
                    Ok(table)
                }
                _ => Self::from_columns(obj),
            },
            _ => Err(ChartError::Parse(
                "JSON input must be an array of records or an object of columns".to_string(),
            )),
        }
    }

    fn from_records(items: &[Value]) -> Result<Self, ChartError> {
        let mut headers: Vec<String> = Vec::new();
        for item in items {
            let obj = item
                .as_object()
                .ok_or_else(|| ChartError::Parse("Items in array must be objects".to_string()))?;
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                headers
                    .iter()
                    .map(|h| obj.get(h).map(Cell::from_json).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        Ok(Self::new(headers, rows))
    }

    fn from_columns(obj: &Map<String, Value>) -> Result<Self, ChartError> {
        let headers: Vec<String> = obj.keys().cloned().collect();

        // Row labels for the `{"col": {"label": value}}` form, in first-appearance order
        let mut labels: Vec<String> = Vec::new();
        let mut height = 0;
        for (name, column) in obj {
            match column {
                Value::Array(values) => height = height.max(values.len()),
                Value::Object(cells) => {
                    for label in cells.keys() {
                        if !labels.contains(label) {
                            labels.push(label.clone());
                        }
                    }
                }
                _ => {
                    return Err(ChartError::Parse(format!(
                        "column '{}' must be an array or an object",
                        name
                    )))
                }
            }
        }
        let height = height.max(labels.len());

        let mut rows: Vec<Vec<Cell>> = vec![Vec::with_capacity(headers.len()); height];
        for column in obj.values() {
            for (pos, row) in rows.iter_mut().enumerate() {
                let value = match column {
                    Value::Array(values) => values.get(pos),
                    Value::Object(cells) => labels.get(pos).and_then(|l| cells.get(l)),
                    _ => None,
                };
                row.push(value.map(Cell::from_json).unwrap_or(Cell::Null));
            }
        }

        Ok(Self::new(headers, rows))
    }

    fn drop_column(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            self.headers.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
    }
}

/// Pick one type for a whole CSV column: ints, then floats, then bools, then text
fn infer_column(values: &[Option<&str>]) -> Vec<Cell> {
    let present = || values.iter().flatten();

    if present().all(|v| v.trim().parse::<i64>().is_ok()) {
        return values
            .iter()
            .map(|v| match v.and_then(|s| s.trim().parse::<i64>().ok()) {
                Some(i) => Cell::Int(i),
                None => Cell::Null,
            })
            .collect();
    }

    if present().all(|v| parse_float(v).is_some()) {
        return values
            .iter()
            .map(|v| v.and_then(parse_float).map(Cell::Float).unwrap_or(Cell::Null))
            .collect();
    }

    if present().all(|v| parse_bool(v).is_some()) {
        return values
            .iter()
            .map(|v| v.and_then(parse_bool).map(Cell::Bool).unwrap_or(Cell::Null))
            .collect();
    }

    values
        .iter()
        .map(|v| match v {
            Some(s) => Cell::Text(s.to_string()),
            None => Cell::Null,
        })
        .collect()
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse::<f64>().ok().filter(|f| !f.is_nan()),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}
