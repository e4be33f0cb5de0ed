use crate::data::{Cell, Table};
use crate::graph::{AxisScale, BarSeries, Canvas, Orientation, Series};
use crate::palette::series_color;
use crate::request::{AxisSpec, RenderOptions};
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use image::RgbImage;
use tracing::debug;

/// Kind of chart to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartType {
    Line,
    Bar,
    Scatter,
}

/// Render inputs shared by every chart kind
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub title: &'a str,
    pub axes: &'a AxisSpec,
    /// Column the rows were grouped on; scatter charts colour points by it
    pub group_column: Option<&'a str>,
    pub options: RenderOptions,
}

/// Draw `table` as the requested chart kind and return the cropped bitmap
pub fn render(chart_type: ChartType, ctx: &RenderContext<'_>, table: &Table) -> Result<RgbImage> {
    debug!(?chart_type, rows = table.len(), title = ctx.title, "rendering chart");
    match chart_type {
        ChartType::Line => render_line(ctx, table),
        ChartType::Bar => render_bar(ctx, table),
        ChartType::Scatter => render_scatter(ctx, table),
    }
}

/// One line per (x column, y column) pairing
fn render_line(ctx: &RenderContext<'_>, table: &Table) -> Result<RgbImage> {
    let x = axis_scale(table, &ctx.axes.x)?;
    let y = axis_scale(table, &ctx.axes.y)?;

    let series = column_pairs(table, ctx.axes)?
        .into_iter()
        .enumerate()
        .map(|(n, pair)| Series {
            points: pair.points(table, &x, &y),
            label: pair.label,
            color: series_color(n),
        })
        .collect::<Vec<_>>();

    let mut canvas = Canvas::new(ctx.options.width, ctx.options.height, ctx.title, x, y)?;
    canvas.draw_lines(&series)?;
    canvas.finish()
}

/// One bar slot per row along the single-valued axis, one bar per series
fn render_bar(ctx: &RenderContext<'_>, table: &Table) -> Result<RgbImage> {
    let (category_names, value_names, orientation) = if ctx.axes.x_is_multi() {
        (&ctx.axes.y, &ctx.axes.x, Orientation::Horizontal)
    } else {
        (&ctx.axes.x, &ctx.axes.y, Orientation::Vertical)
    };

    let category_name = category_names
        .first()
        .ok_or_else(|| anyhow!("Bar charts need a category column"))?;
    let category_idx = column_index(table, category_name)?;
    let categories: Vec<String> = table.column(category_idx).map(Cell::to_string).collect();
    let category_axis = AxisScale::categorical(category_name.clone(), categories);

    let mut all_values = Vec::new();
    let mut series = Vec::with_capacity(value_names.len());
    for (n, name) in value_names.iter().enumerate() {
        let idx = column_index(table, name)?;
        let values: Vec<Option<f64>> = table.column(idx).map(Cell::as_f64).collect();
        all_values.extend(values.iter().flatten().copied());
        series.push(BarSeries {
            label: name.clone(),
            values,
            color: series_color(n),
        });
    }
    let value_axis = AxisScale::continuous(value_names.join(", "), all_values).with_zero();

    let (x, y) = match orientation {
        Orientation::Vertical => (category_axis, value_axis),
        Orientation::Horizontal => (value_axis, category_axis),
    };
    let mut canvas = Canvas::new(ctx.options.width, ctx.options.height, ctx.title, x, y)?;
    canvas.draw_bars(&series, orientation)?;
    canvas.finish()
}

/// Point cloud; coloured by the group column when there is one
fn render_scatter(ctx: &RenderContext<'_>, table: &Table) -> Result<RgbImage> {
    let x = axis_scale(table, &ctx.axes.x)?;
    let y = axis_scale(table, &ctx.axes.y)?;
    let pairs = column_pairs(table, ctx.axes)?;

    let group_idx = ctx
        .group_column
        .map(|name| column_index(table, name))
        .transpose()?;

    let (series, legend) = match group_idx {
        Some(group_idx) => {
            // One colour per distinct group value, in first-appearance order
            let mut groups: Vec<String> = Vec::new();
            for cell in table.column(group_idx) {
                let key = cell.to_string();
                if !groups.contains(&key) {
                    groups.push(key);
                }
            }

            let mut series: Vec<Series> = groups
                .iter()
                .enumerate()
                .map(|(n, key)| Series {
                    label: key.clone(),
                    points: Vec::new(),
                    color: series_color(n),
                })
                .collect();

            for pair in &pairs {
                for (row, point) in pair.points_by_row(table, &x, &y) {
                    let key = table.rows[row][group_idx].to_string();
                    if let Some(slot) = groups.iter().position(|g| *g == key) {
                        series[slot].points.push(point);
                    }
                }
            }
            (series, true)
        }
        None => {
            let legend = pairs.len() > 1;
            let series: Vec<Series> = pairs
                .into_iter()
                .enumerate()
                .map(|(n, pair)| Series {
                    points: pair.points(table, &x, &y),
                    label: pair.label,
                    color: series_color(n),
                })
                .collect();
            (series, legend)
        }
    };

    let mut canvas = Canvas::new(ctx.options.width, ctx.options.height, ctx.title, x, y)?;
    canvas.draw_points(&series, legend)?;
    canvas.finish()
}

/// A single plotted (x column, y column) combination
#[derive(Debug, Clone, PartialEq)]
struct ColumnPair {
    label: String,
    x_idx: usize,
    y_idx: usize,
}

impl ColumnPair {
    fn points(&self, table: &Table, x: &AxisScale, y: &AxisScale) -> Vec<(f64, f64)> {
        self.points_by_row(table, x, y).map(|(_, p)| p).collect()
    }

    /// Plot coordinates with their row number; rows with a null on either side are skipped
    fn points_by_row<'t>(
        &'t self,
        table: &'t Table,
        x: &'t AxisScale,
        y: &'t AxisScale,
    ) -> impl Iterator<Item = (usize, (f64, f64))> + 't {
        table.rows.iter().enumerate().filter_map(move |(row, cells)| {
            let px = position(x, &cells[self.x_idx])?;
            let py = position(y, &cells[self.y_idx])?;
            Some((row, (px, py)))
        })
    }
}

/// X × Y column pairings; the multi-valued side names each series
fn column_pairs(table: &Table, axes: &AxisSpec) -> Result<Vec<ColumnPair>> {
    let mut pairs = Vec::new();
    for x_name in &axes.x {
        for y_name in &axes.y {
            let label = if axes.x_is_multi() { x_name } else { y_name };
            pairs.push(ColumnPair {
                label: label.clone(),
                x_idx: column_index(table, x_name)?,
                y_idx: column_index(table, y_name)?,
            });
        }
    }
    Ok(pairs)
}

/// Continuous when every non-null cell of the columns is numeric, categorical otherwise
fn axis_scale(table: &Table, names: &[String]) -> Result<AxisScale> {
    let label = names.join(", ");
    let indices = names
        .iter()
        .map(|name| column_index(table, name))
        .collect::<Result<Vec<_>>>()?;
    let cells = || {
        indices
            .iter()
            .flat_map(move |&idx| table.column(idx))
            .filter(|c| !c.is_null())
    };

    if cells().all(Cell::is_numeric) {
        return Ok(AxisScale::continuous(label, cells().filter_map(Cell::as_f64)));
    }

    let mut categories: Vec<String> = Vec::new();
    for cell in cells() {
        let text = cell.to_string();
        if !categories.contains(&text) {
            categories.push(text);
        }
    }
    Ok(AxisScale::categorical(label, categories))
}

/// Where a cell lands on an axis
fn position(axis: &AxisScale, cell: &Cell) -> Option<f64> {
    if cell.is_null() {
        return None;
    }
    match &axis.categories {
        Some(categories) => {
            let text = cell.to_string();
            categories.iter().position(|c| *c == text).map(|i| i as f64)
        }
        None => cell.as_f64(),
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| anyhow!("Column '{}' not found", name))
}
