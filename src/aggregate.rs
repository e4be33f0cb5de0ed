use crate::chart::ChartType;
use crate::data::{Cell, Table};
use crate::error::{ChartError, ColumnRole};
use crate::request::AxisSpec;
use clap::ValueEnum;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Reduction applied to every non-key column of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupByFunc {
    Sum,
    Max,
    Min,
    Prod,
    First,
    Last,
}

impl GroupByFunc {
    /// max, min and prod only make sense on numeric columns; others are dropped
    fn numeric_only(self) -> bool {
        matches!(self, GroupByFunc::Max | GroupByFunc::Min | GroupByFunc::Prod)
    }
}

/// How a column's cells behave under arithmetic reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// ints and bools (and nulls)
    Integer,
    /// numeric with at least one float
    Float,
    Other,
}

impl ColumnKind {
    fn of(table: &Table, idx: usize) -> Self {
        let mut has_float = false;
        for cell in table.column(idx) {
            match cell {
                Cell::Float(_) => has_float = true,
                Cell::Null | Cell::Int(_) | Cell::Bool(_) => {}
                Cell::Text(_) => return ColumnKind::Other,
            }
        }
        if has_float {
            ColumnKind::Float
        } else {
            ColumnKind::Integer
        }
    }
}

/// Pick the column to group on, if any.
///
/// Line and bar charts always group on the first X column, or on the first Y
/// column when X names several columns; `explicit` is ignored for them.
/// Scatter charts only group when a column is given.
pub fn resolve_group_column(
    chart_type: ChartType,
    explicit: Option<&str>,
    axes: &AxisSpec,
) -> Option<String> {
    match chart_type {
        ChartType::Line | ChartType::Bar => {
            if axes.x_is_multi() {
                axes.first_y().map(str::to_string)
            } else {
                axes.first_x().map(str::to_string)
            }
        }
        ChartType::Scatter => explicit.map(str::to_string),
    }
}

/// Collapse rows sharing a value in `column` into one row per key.
///
/// Groups keep the order in which their key first appears; rows with a null
/// key are dropped. The key column leads the output header.
pub fn group_by(table: &Table, column: &str, func: GroupByFunc) -> Result<Table, ChartError> {
    let key_idx = table
        .column_index(column)
        .ok_or_else(|| ChartError::UnknownColumn {
            role: ColumnRole::GroupBy,
            column: column.to_string(),
            valid: table.headers.clone(),
        })?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Cell, Vec<usize>)> = Vec::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let key = &row[key_idx];
        if key.is_null() {
            continue;
        }
        // Debug output keeps 1 and "1" apart
        let slot = *positions.entry(format!("{:?}", key)).or_insert_with(|| {
            groups.push((key.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row_idx);
    }

    let value_columns: Vec<(usize, ColumnKind)> = (0..table.headers.len())
        .filter(|&idx| idx != key_idx)
        .map(|idx| (idx, ColumnKind::of(table, idx)))
        .filter(|(_, kind)| !(func.numeric_only() && *kind == ColumnKind::Other))
        .collect();

    let mut headers = vec![table.headers[key_idx].clone()];
    headers.extend(value_columns.iter().map(|(idx, _)| table.headers[*idx].clone()));

    let rows = groups
        .into_iter()
        .map(|(key, members)| {
            let mut row = Vec::with_capacity(headers.len());
            row.push(key);
            for &(idx, kind) in &value_columns {
                let cells: Vec<&Cell> = members
                    .iter()
                    .map(|&r| &table.rows[r][idx])
                    .filter(|c| !c.is_null())
                    .collect();
                row.push(reduce(func, kind, &cells));
            }
            row
        })
        .collect::<Vec<_>>();

    debug!(
        column,
        ?func,
        groups = rows.len(),
        dropped = table.headers.len() - headers.len(),
        "grouped rows"
    );
    Ok(Table::new(headers, rows))
}

/// Reduce the non-null cells of one group
fn reduce(func: GroupByFunc, kind: ColumnKind, cells: &[&Cell]) -> Cell {
    match func {
        GroupByFunc::First => cells.first().map(|c| (*c).clone()).unwrap_or(Cell::Null),
        GroupByFunc::Last => cells.last().map(|c| (*c).clone()).unwrap_or(Cell::Null),
        GroupByFunc::Max => cells
            .iter()
            .max_by(|a, b| compare_numeric(a, b))
            .map(|c| (*c).clone())
            .unwrap_or(Cell::Null),
        GroupByFunc::Min => cells
            .iter()
            .min_by(|a, b| compare_numeric(a, b))
            .map(|c| (*c).clone())
            .unwrap_or(Cell::Null),
        GroupByFunc::Sum => match kind {
            ColumnKind::Integer => fold_ints(cells, 0, i64::checked_add, |a, b| a + b),
            ColumnKind::Float => Cell::Float(cells.iter().filter_map(|c| c.as_f64()).sum()),
            ColumnKind::Other if cells.is_empty() => Cell::Int(0),
            ColumnKind::Other => Cell::Text(cells.iter().map(|c| c.to_string()).collect()),
        },
        GroupByFunc::Prod => match kind {
            ColumnKind::Integer => fold_ints(cells, 1, i64::checked_mul, |a, b| a * b),
            ColumnKind::Float | ColumnKind::Other => {
                Cell::Float(cells.iter().filter_map(|c| c.as_f64()).product())
            }
        },
    }
}

fn compare_numeric(a: &Cell, b: &Cell) -> Ordering {
    a.as_f64()
        .partial_cmp(&b.as_f64())
        .unwrap_or(Ordering::Equal)
}

/// Integer fold that finishes in floating point once it overflows
fn fold_ints(
    cells: &[&Cell],
    init: i64,
    op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Cell {
    let mut acc = init;
    for (pos, cell) in cells.iter().enumerate() {
        let value = match cell {
            Cell::Int(i) => *i,
            Cell::Bool(b) => i64::from(*b),
            _ => continue,
        };
        match op(acc, value) {
            Some(next) => acc = next,
            None => {
                let total = cells[pos..]
                    .iter()
                    .filter_map(|c| c.as_f64())
                    .fold(acc as f64, float_op);
                return Cell::Float(total);
            }
        }
    }
    Cell::Int(acc)
}
