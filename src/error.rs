use thiserror::Error;

/// Which part of the request referenced a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    X,
    Y,
    GroupBy,
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRole::X => write!(f, "X axis"),
            ColumnRole::Y => write!(f, "Y axis"),
            ColumnRole::GroupBy => write!(f, "group by"),
        }
    }
}

/// User-facing failures. Every variant is fatal and its message is printed
/// verbatim before exiting with status 1.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Especifique el contenido de los datos mediante el argumento --data o < NOMBRE FICHERO")]
    NoDataSource,

    #[error("No se ha encontrado el fichero especificado")]
    NotFound { path: String },

    #[error("Datos no encontrados mediante URL")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Seleccione un valor del listado para {role}: {}", python_list(.valid))]
    UnknownColumn {
        role: ColumnRole,
        column: String,
        valid: Vec<String>,
    },

    #[error("Sólo puede especificar múltiples campos para un eje")]
    MultiAxisConflict,

    #[error("No se han podido interpretar los datos: {0}")]
    Parse(String),
}

/// Python-style list of column names: `['a', 'b']`
fn python_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| python_repr(s)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Single quotes unless the text has a `'` and no `"`
fn python_repr(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\");
    if text.contains('\'') && !text.contains('"') {
        format!("\"{}\"", escaped)
    } else {
        format!("'{}'", escaped.replace('\'', "\\'"))
    }
}
