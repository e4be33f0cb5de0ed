use crate::error::{ChartError, ColumnRole};
use crate::request::AxisSpec;

/// Check the requested axis columns against the table header.
///
/// Only one axis may name several columns. X names are checked before Y names.
pub fn validate_axes(axes: &AxisSpec, headers: &[String]) -> Result<(), ChartError> {
    if axes.x_is_multi() && axes.y_is_multi() {
        return Err(ChartError::MultiAxisConflict);
    }

    for name in &axes.x {
        require_column(name, ColumnRole::X, headers)?;
    }
    for name in &axes.y {
        require_column(name, ColumnRole::Y, headers)?;
    }
    Ok(())
}

pub fn require_column(name: &str, role: ColumnRole, headers: &[String]) -> Result<(), ChartError> {
    if headers.iter().any(|h| h == name) {
        Ok(())
    } else {
        Err(ChartError::UnknownColumn {
            role,
            column: name.to_string(),
            valid: headers.to_vec(),
        })
    }
}
