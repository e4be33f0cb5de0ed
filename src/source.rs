use crate::data::Table;
use crate::error::ChartError;
use anyhow::{Context, Result};
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Serialization of the raw data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

/// What the location says about its own format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatHint {
    /// File extension, without the dot
    Extension(String),
    /// HTTP `Content-Type` header value
    ContentType(String),
}

impl FormatHint {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FormatHint::Extension(ext.to_ascii_lowercase()))
    }

    fn format(&self) -> Option<DataFormat> {
        match self {
            FormatHint::Extension(ext) => match ext.as_str() {
                "json" => Some(DataFormat::Json),
                "csv" => Some(DataFormat::Csv),
                _ => None,
            },
            FormatHint::ContentType(value) => {
                // Only the media type counts, not parameters such as charset
                let essence = value
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                let subtype = essence.split_once('/').map(|(_, sub)| sub)?;
                if subtype.contains("json") {
                    Some(DataFormat::Json)
                } else if subtype.contains("csv") {
                    Some(DataFormat::Csv)
                } else {
                    None
                }
            }
        }
    }
}

impl DataFormat {
    /// Decide from the hint first, then from the content itself
    pub fn detect(hint: Option<&FormatHint>, content: &str) -> Self {
        if let Some(format) = hint.and_then(FormatHint::format) {
            return format;
        }

        match content.trim_start().chars().next() {
            Some('[') | Some('{') => DataFormat::Json,
            _ => DataFormat::Csv,
        }
    }

    pub fn parse(self, content: &str) -> Result<Table, ChartError> {
        match self {
            DataFormat::Csv => Table::from_csv(content),
            DataFormat::Json => Table::from_json(content),
        }
    }
}

/// Origin of the raw table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A URL or filesystem path given with `--data`
    Location(String),
    /// Text piped through standard input
    Stdin(String),
}

impl DataSource {
    /// `--data` wins over piped input; having neither is an error
    pub fn select(data: Option<&str>, piped: Option<String>) -> Result<Self, ChartError> {
        match (data, piped) {
            (Some(location), _) => Ok(DataSource::Location(location.to_string())),
            (None, Some(text)) => Ok(DataSource::Stdin(text)),
            (None, None) => Err(ChartError::NoDataSource),
        }
    }

    /// Read stdin to completion unless it is attached to a terminal.
    /// Blank input counts as no input.
    pub fn read_piped_stdin() -> Result<Option<String>> {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Ok(None);
        }
        let mut text = String::new();
        stdin
            .lock()
            .read_to_string(&mut text)
            .context("Failed to read data from stdin")?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    /// Fetch (if needed) and parse the data into a table
    pub fn load(&self) -> Result<Table> {
        let (hint, content) = match self {
            DataSource::Stdin(text) => (None, text.clone()),
            DataSource::Location(location) => fetch(location)?,
        };

        let format = DataFormat::detect(hint.as_ref(), &content);
        debug!(?format, bytes = content.len(), "parsing data");
        let table = format.parse(&content)?;
        info!(columns = table.headers.len(), rows = table.len(), "loaded table");
        Ok(table)
    }
}

/// Returns the format hint and the body
fn fetch(location: &str) -> Result<(Option<FormatHint>, String)> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch_http(&url),
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| ChartError::NotFound { path: location.to_string() })?;
            read_file(&path)
        }
        // Plain paths, including Windows drive letters that parse as a scheme
        _ => read_file(Path::new(location)),
    }
}

fn fetch_http(url: &Url) -> Result<(Option<FormatHint>, String)> {
    info!(%url, "fetching data");
    let fetch_error = |source| ChartError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url.clone())
        .and_then(|r| r.error_for_status())
        .map_err(fetch_error)?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| FormatHint::ContentType(v.to_string()));
    let body = response.text().map_err(fetch_error)?;

    // A recognised extension is a stronger hint than a generic content type
    let hint = FormatHint::from_path(Path::new(url.path()))
        .filter(|hint| hint.format().is_some())
        .or(content_type);
    Ok((hint, body))
}

fn read_file(path: &Path) -> Result<(Option<FormatHint>, String)> {
    debug!(path = %path.display(), "reading data file");
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => anyhow::Error::new(ChartError::NotFound {
            path: path.display().to_string(),
        }),
        _ => anyhow::Error::new(e).context(format!("Failed to read {}", path.display())),
    })?;
    Ok((FormatHint::from_path(path), content))
}
