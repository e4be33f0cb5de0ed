use crate::aggregate::GroupByFunc;
use crate::chart::ChartType;
use std::path::PathBuf;

/// Column names assigned to each axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSpec {
    pub x: Vec<String>,
    pub y: Vec<String>,
}

impl AxisSpec {
    pub fn new(x: Vec<String>, y: Vec<String>) -> Self {
        Self { x, y }
    }

    pub fn first_x(&self) -> Option<&str> {
        self.x.first().map(String::as_str)
    }

    pub fn first_y(&self) -> Option<&str> {
        self.y.first().map(String::as_str)
    }

    pub fn x_is_multi(&self) -> bool {
        self.x.len() > 1
    }

    pub fn y_is_multi(&self) -> bool {
        self.y.len() > 1
    }
}

/// Where the rendered chart goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Write the image to this file
    File(PathBuf),
    /// Print `{imageBase64, sourceData}` to stdout
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Everything the pipeline needs, built once from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub chart_type: ChartType,
    pub title: String,
    pub axes: AxisSpec,
    pub group_by: Option<String>,
    pub group_by_func: GroupByFunc,
    pub x_select: Option<Vec<String>>,
    pub y_select: Option<Vec<String>>,
    pub output: OutputMode,
    pub render: RenderOptions,
}

impl ChartRequest {
    /// A line chart of `y` against `x` written to a file named after the default title
    pub fn new(x: Vec<String>, y: Vec<String>) -> Self {
        Self {
            chart_type: ChartType::Line,
            title: "Chart name".to_string(),
            axes: AxisSpec::new(x, y),
            group_by: None,
            group_by_func: GroupByFunc::Sum,
            x_select: None,
            y_select: None,
            output: OutputMode::File(PathBuf::from("Chart name")),
            render: RenderOptions::default(),
        }
    }
}
