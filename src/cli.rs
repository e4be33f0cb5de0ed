use crate::aggregate::GroupByFunc;
use crate::chart::ChartType;
use crate::request::{AxisSpec, ChartRequest, OutputMode, RenderOptions};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tablechart")]
#[command(about = "Render CSV or JSON tables as line, bar or scatter charts", long_about = None)]
pub struct Args {
    /// Chart X axis
    #[arg(long = "x-axis", num_args = 1.., required = true)]
    pub x_axis: Vec<String>,

    /// Chart Y axis
    #[arg(long = "y-axis", num_args = 1.., required = true)]
    pub y_axis: Vec<String>,

    /// X axis data values selected for rendering
    #[arg(long = "x-select", num_args = 1..)]
    pub x_select: Option<Vec<String>>,

    /// Y axis data values selected for rendering
    #[arg(long = "y-select", num_args = 1..)]
    pub y_select: Option<Vec<String>>,

    /// URL or path of a file with data. Only csv and json formats
    #[arg(long)]
    pub data: Option<String>,

    /// Chart type
    #[arg(long = "chart-type", value_enum, default_value_t = ChartType::Line)]
    pub chart_type: ChartType,

    /// Chart name
    #[arg(long = "chart-name", default_value = "Chart name")]
    pub chart_name: String,

    /// Chart file name (defaults to the chart name)
    #[arg(long = "chart-file-name")]
    pub chart_file_name: Option<PathBuf>,

    /// Print result as json
    #[arg(long = "as-json")]
    pub as_json: bool,

    /// Column to group rows by
    #[arg(long = "group-by")]
    pub group_by: Option<String>,

    /// Grouping function
    #[arg(long = "group-by-func", value_enum, default_value_t = GroupByFunc::Sum)]
    pub group_by_func: GroupByFunc,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}

impl Args {
    /// Freeze the parsed arguments into the request passed down the pipeline
    pub fn to_request(&self) -> ChartRequest {
        let output = if self.as_json {
            OutputMode::Json
        } else {
            OutputMode::File(
                self.chart_file_name
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&self.chart_name)),
            )
        };

        ChartRequest {
            chart_type: self.chart_type,
            title: self.chart_name.clone(),
            axes: AxisSpec::new(self.x_axis.clone(), self.y_axis.clone()),
            group_by: self.group_by.clone(),
            group_by_func: self.group_by_func,
            x_select: self.x_select.clone(),
            y_select: self.y_select.clone(),
            output,
            render: RenderOptions {
                width: self.width,
                height: self.height,
            },
        }
    }
}
