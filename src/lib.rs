// Library exports for tablechart

pub mod aggregate;
pub mod chart;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod graph;
pub mod output;
pub mod palette;
pub mod request;
pub mod runtime;
pub mod source;
pub mod validate;

pub use error::ChartError;
pub use request::{AxisSpec, ChartRequest, OutputMode, RenderOptions};
pub use runtime::{build_chart, RenderedChart};
