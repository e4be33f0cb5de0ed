use crate::data::Table;
use crate::graph::encode_png;
use crate::request::OutputMode;
use crate::runtime::RenderedChart;
use anyhow::{Context, Result};
use base64::Engine as _;
use image::ImageFormat;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Version tag carried in the table schema; consumers read it as the pandas table-schema version
const TABLE_SCHEMA_VERSION: &str = "1.4.0";

/// The `--as-json` payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonEnvelope {
    pub image_base64: String,
    pub source_data: Value,
}

impl JsonEnvelope {
    pub fn new(chart: &RenderedChart) -> Result<Self> {
        let png = encode_png(&chart.image)?;
        Ok(Self {
            image_base64: base64::engine::general_purpose::STANDARD.encode(png),
            source_data: table_schema_json(&chart.data),
        })
    }
}

/// Deliver the chart: write the image file, or print the JSON envelope to `out`.
///
/// Returns the path written in file mode.
pub fn emit<W: Write>(
    chart: &RenderedChart,
    mode: &OutputMode,
    out: &mut W,
) -> Result<Option<PathBuf>> {
    match mode {
        OutputMode::File(name) => {
            let path = resolve_file_name(name);
            write_image(chart, &path)?;
            Ok(Some(path))
        }
        OutputMode::Json => {
            let envelope = JsonEnvelope::new(chart)?;
            serde_json::to_writer(&mut *out, &envelope).context("Failed to write JSON output")?;
            out.flush().context("Failed to flush stdout")?;
            Ok(None)
        }
    }
}

/// Names without an extension get `.png`
pub fn resolve_file_name(name: &Path) -> PathBuf {
    if name.extension().is_some() {
        return name.to_path_buf();
    }
    let mut with_ext = name.as_os_str().to_owned();
    with_ext.push(".png");
    PathBuf::from(with_ext)
}

fn write_image(chart: &RenderedChart, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("Unsupported image format for '{}'", path.display()))?;
    chart
        .image
        .save_with_format(path, format)
        .with_context(|| format!("Failed to write chart to '{}'", path.display()))?;
    info!(path = %path.display(), ?format, "chart written");
    Ok(())
}

/// Table-schema encoding: field list with types, plus one object per row
/// tagged with its index label
pub fn table_schema_json(table: &Table) -> Value {
    let index_name = if table.headers.iter().any(|h| h == "index") {
        "level_0"
    } else {
        "index"
    };

    let mut fields = vec![json!({ "name": index_name, "type": "integer" })];
    fields.extend((0..table.headers.len()).map(|idx| {
        json!({
            "name": table.headers[idx],
            "type": table.column_type(idx).as_str(),
        })
    }));

    let data: Vec<Value> = table
        .rows
        .iter()
        .zip(&table.index)
        .map(|(row, label)| {
            let mut record = Map::new();
            record.insert(index_name.to_string(), Value::from(*label));
            for (header, cell) in table.headers.iter().zip(row) {
                record.insert(header.clone(), cell.to_json());
            }
            Value::Object(record)
        })
        .collect();

    json!({
        "schema": {
            "fields": fields,
            "primaryKey": [index_name],
            "pandas_version": TABLE_SCHEMA_VERSION,
        },
        "data": data,
    })
}
