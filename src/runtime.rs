// Pipeline executor: validation, grouping, filtering and rendering

use crate::aggregate;
use crate::chart::{self, RenderContext};
use crate::data::Table;
use crate::filter;
use crate::request::ChartRequest;
use crate::validate::validate_axes;
use anyhow::Result;
use image::RgbImage;
use tracing::info;

/// The cropped chart image together with the table that produced it
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub image: RgbImage,
    pub data: Table,
}

/// Run every stage after loading: validate, group, filter, then draw
pub fn build_chart(request: &ChartRequest, table: Table) -> Result<RenderedChart> {
    validate_axes(&request.axes, &table.headers)?;

    let group_column = aggregate::resolve_group_column(
        request.chart_type,
        request.group_by.as_deref(),
        &request.axes,
    );
    let table = match &group_column {
        Some(column) => {
            info!(column = column.as_str(), func = ?request.group_by_func, "grouping rows");
            aggregate::group_by(&table, column, request.group_by_func)?
        }
        None => table,
    };

    let table = filter::apply_selects(
        table,
        &request.axes,
        request.x_select.as_deref(),
        request.y_select.as_deref(),
    );

    let ctx = RenderContext {
        title: &request.title,
        axes: &request.axes,
        group_column: group_column.as_deref(),
        options: request.render,
    };
    let image = chart::render(request.chart_type, &ctx, &table)?;
    info!(width = image.width(), height = image.height(), rows = table.len(), "chart rendered");

    Ok(RenderedChart { image, data: table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GroupByFunc;
    use crate::chart::ChartType;
    use crate::data::Cell;
    use crate::error::{ChartError, ColumnRole};
    use pretty_assertions::assert_eq;

    fn request(x: &[&str], y: &[&str]) -> ChartRequest {
        let mut request = ChartRequest::new(
            x.iter().map(|s| s.to_string()).collect(),
            y.iter().map(|s| s.to_string()).collect(),
        );
        request.render.width = 400;
        request.render.height = 300;
        request
    }

    fn chart_error(err: &anyhow::Error) -> &ChartError {
        err.downcast_ref::<ChartError>().expect("expected a ChartError")
    }

    #[test]
    fn test_line_chart_groups_by_x_with_sum() {
        let table = Table::from_csv("a,b\n1,10\n1,20\n2,30\n").unwrap();
        let chart = build_chart(&request(&["a"], &["b"]), table).unwrap();
        assert_eq!(
            chart.data.rows,
            vec![
                vec![Cell::Int(1), Cell::Int(30)],
                vec![Cell::Int(2), Cell::Int(30)],
            ]
        );
    }

    #[test]
    fn test_bar_chart_with_multi_x_groups_by_y() {
        let table = Table::from_csv("p,q,k\n1,2,a\n3,4,a\n5,6,b\n").unwrap();
        let mut req = request(&["p", "q"], &["k"]);
        req.chart_type = ChartType::Bar;
        req.group_by_func = GroupByFunc::Max;
        let chart = build_chart(&req, table).unwrap();
        assert_eq!(chart.data.headers, vec!["k", "p", "q"]);
        assert_eq!(
            chart.data.rows[0],
            vec![Cell::Text("a".to_string()), Cell::Int(3), Cell::Int(4)]
        );
    }

    #[test]
    fn test_scatter_without_group_by_keeps_every_row() {
        let table = Table::from_csv("x,y\n1,10\n1,20\n2,30\n").unwrap();
        let mut req = request(&["x"], &["y"]);
        req.chart_type = ChartType::Scatter;
        let chart = build_chart(&req, table.clone()).unwrap();
        assert_eq!(chart.data, table);
    }

    #[test]
    fn test_scatter_with_explicit_group_by() {
        let table = Table::from_csv("x,y,k\n1,10,a\n2,20,a\n3,30,b\n").unwrap();
        let mut req = request(&["x"], &["y"]);
        req.chart_type = ChartType::Scatter;
        req.group_by = Some("k".to_string());
        let chart = build_chart(&req, table).unwrap();
        assert_eq!(chart.data.len(), 2);
        assert_eq!(chart.data.headers, vec!["k", "x", "y"]);
    }

    #[test]
    fn test_line_chart_ignores_explicit_group_by() {
        let table = Table::from_csv("a,b,k\n1,10,x\n1,20,y\n2,30,x\n").unwrap();
        let mut req = request(&["a"], &["b"]);
        req.group_by = Some("k".to_string());
        let chart = build_chart(&req, table).unwrap();
        assert_eq!(chart.data.headers, vec!["a", "b", "k"]);
        assert_eq!(chart.data.rows[0][1], Cell::Int(30));
        assert_eq!(chart.data.len(), 2);
    }

    #[test]
    fn test_filter_runs_after_grouping() {
        let table = Table::from_csv("a,b\n1,10\n1,20\n2,30\n3,5\n").unwrap();
        let mut req = request(&["a"], &["b"]);
        req.x_select = Some(vec!["1".to_string(), "3".to_string()]);
        let chart = build_chart(&req, table).unwrap();
        assert_eq!(chart.data.index, vec![0, 2]);
        assert_eq!(chart.data.rows[0][1], Cell::Int(30));
    }

    #[test]
    fn test_unknown_x_column() {
        let table = Table::from_csv("a,b\n1,2\n").unwrap();
        let err = build_chart(&request(&["foo"], &["b"]), table).unwrap_err();
        assert!(matches!(
            chart_error(&err),
            ChartError::UnknownColumn { role: ColumnRole::X, .. }
        ));
        assert_eq!(err.to_string(), "Seleccione un valor del listado para X axis: ['a', 'b']");
    }

    #[test]
    fn test_multi_axis_conflict() {
        let table = Table::from_csv("a,b,c,d\n1,2,3,4\n").unwrap();
        let err = build_chart(&request(&["a", "b"], &["c", "d"]), table).unwrap_err();
        assert!(matches!(chart_error(&err), ChartError::MultiAxisConflict));
    }

    #[test]
    fn test_unknown_group_column() {
        let table = Table::from_csv("a,b\n1,2\n").unwrap();
        let mut req = request(&["a"], &["b"]);
        req.chart_type = ChartType::Scatter;
        req.group_by = Some("zzz".to_string());
        let err = build_chart(&req, table).unwrap_err();
        assert!(matches!(
            chart_error(&err),
            ChartError::UnknownColumn { role: ColumnRole::GroupBy, .. }
        ));
    }
}
