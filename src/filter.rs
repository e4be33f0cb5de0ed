use crate::data::{Cell, Table};
use crate::request::AxisSpec;
use tracing::debug;

/// Keep rows whose first-X and first-Y values appear in the given allow-lists.
///
/// A missing list leaves that axis unfiltered; both lists must match when given.
/// Kept rows retain their index labels.
pub fn apply_selects(
    table: Table,
    axes: &AxisSpec,
    x_select: Option<&[String]>,
    y_select: Option<&[String]>,
) -> Table {
    let table = match (axes.first_x(), x_select) {
        (Some(column), Some(allowed)) => retain_values(table, column, allowed),
        _ => table,
    };
    match (axes.first_y(), y_select) {
        (Some(column), Some(allowed)) => retain_values(table, column, allowed),
        _ => table,
    }
}

/// Keep rows whose cell in `column` matches one of `allowed`
pub fn retain_values(table: Table, column: &str, allowed: &[String]) -> Table {
    let Some(idx) = table.column_index(column) else {
        return table;
    };

    let before = table.len();
    let Table { headers, rows, index } = table;
    let (rows, index): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .zip(index)
        .filter(|(row, _)| allowed.iter().any(|value| cell_matches(&row[idx], value)))
        .unzip();

    debug!(column, kept = rows.len(), dropped = before - rows.len(), "filtered rows");
    Table { headers, rows, index }
}

/// Text comparison, with numeric equality for numeric cells ("1.0" matches 1)
fn cell_matches(cell: &Cell, value: &str) -> bool {
    if cell.is_null() {
        return false;
    }
    if cell.to_string() == value {
        return true;
    }
    match (cell.as_f64(), value.trim().parse::<f64>()) {
        (Some(n), Ok(v)) if !matches!(cell, Cell::Bool(_)) => n == v,
        _ => false,
    }
}
