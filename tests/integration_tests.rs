use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

struct RunResult {
    success: bool,
    code: Option<i32>,
    stdout: Vec<u8>,
    stderr: String,
}

/// Run tablechart with the given arguments, piping `stdin` when provided
fn run_tablechart(args: &[&str], stdin: Option<&str>, cwd: Option<&Path>) -> RunResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tablechart"));
    command
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().expect("Failed to spawn tablechart");
    if let (Some(text), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(text.as_bytes()).expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait for tablechart");
    RunResult {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

/// Parse a JSON envelope and check its image is a PNG
fn parse_envelope(result: &RunResult) -> Value {
    assert!(result.success, "Failed: {}", result.stderr);
    let text = String::from_utf8(result.stdout.clone()).expect("stdout is not UTF-8");
    assert!(!text.ends_with('\n'), "JSON output must not end with a newline");
    let value: Value = serde_json::from_str(&text).expect("stdout is not JSON");
    let png = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        value["imageBase64"].as_str().expect("imageBase64 missing"),
    )
    .expect("imageBase64 is not base64");
    assert!(is_valid_png(&png), "imageBase64 is not a PNG");
    value
}

fn rows(value: &Value) -> &Vec<Value> {
    value["sourceData"]["data"].as_array().expect("sourceData.data missing")
}

#[test]
fn test_end_to_end_sum_grouping_example() {
    let result = run_tablechart(
        &["--x-axis", "a", "--y-axis", "b", "--as-json"],
        Some("a,b\n1,10\n1,20\n2,30\n"),
        None,
    );
    let value = parse_envelope(&result);
    assert_eq!(
        value["sourceData"]["data"],
        json!([{"index": 0, "a": 1, "b": 30}, {"index": 1, "a": 2, "b": 30}])
    );
    assert_eq!(value["sourceData"]["schema"]["primaryKey"], json!(["index"]));
}

#[test]
fn test_end_to_end_json_is_idempotent() {
    let args = [
        "--data",
        "test/sales.csv",
        "--x-axis",
        "region",
        "--y-axis",
        "units",
        "--as-json",
    ];
    let first = parse_envelope(&run_tablechart(&args, None, None));
    let second = parse_envelope(&run_tablechart(&args, None, None));
    assert_eq!(
        serde_json::to_string(&first["sourceData"]).unwrap(),
        serde_json::to_string(&second["sourceData"]).unwrap()
    );
}

#[test]
fn test_end_to_end_line_chart_file_default_name() {
    let dir = tempfile::tempdir().unwrap();
    let csv = std::fs::read_to_string("test/timeseries.csv").expect("Failed to read test CSV");
    let result = run_tablechart(
        &["--x-axis", "day", "--y-axis", "temperature", "humidity", "--chart-name", "Weather"],
        Some(&csv),
        Some(dir.path()),
    );
    assert!(result.success, "Failed: {}", result.stderr);
    assert!(result.stdout.is_empty());

    let bytes = std::fs::read(dir.path().join("Weather.png")).expect("chart file missing");
    assert!(is_valid_png(&bytes));
}

#[test]
fn test_end_to_end_bar_chart_explicit_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("bars.png");
    let result = run_tablechart(
        &[
            "--data",
            "test/sales.csv",
            "--chart-type",
            "bar",
            "--x-axis",
            "region",
            "--y-axis",
            "units",
            "revenue",
            "--chart-file-name",
            target.to_str().unwrap(),
        ],
        None,
        None,
    );
    assert!(result.success, "Failed: {}", result.stderr);
    assert!(is_valid_png(&std::fs::read(&target).unwrap()));
}

#[test]
fn test_end_to_end_bar_chart_multi_x_groups_by_y() {
    let result = run_tablechart(
        &[
            "--data",
            "test/sales.csv",
            "--chart-type",
            "bar",
            "--x-axis",
            "units",
            "revenue",
            "--y-axis",
            "quarter",
            "--group-by-func",
            "max",
            "--as-json",
        ],
        None,
        None,
    );
    let value = parse_envelope(&result);
    assert_eq!(
        value["sourceData"]["data"],
        json!([
            {"index": 0, "quarter": "Q1", "units": 10, "revenue": 1200.5},
            {"index": 1, "quarter": "Q2", "units": 12, "revenue": 1410.25},
        ])
    );
}

#[test]
fn test_end_to_end_scatter_without_group_by_keeps_rows() {
    let result = run_tablechart(
        &[
            "--data",
            "test/points.json",
            "--chart-type",
            "scatter",
            "--x-axis",
            "height",
            "--y-axis",
            "weight",
            "--as-json",
        ],
        None,
        None,
    );
    let value = parse_envelope(&result);
    assert_eq!(rows(&value).len(), 5);
}

#[test]
fn test_end_to_end_scatter_with_group_by() {
    let result = run_tablechart(
        &[
            "--data",
            "test/points.json",
            "--chart-type",
            "scatter",
            "--x-axis",
            "height",
            "--y-axis",
            "weight",
            "--group-by",
            "team",
            "--group-by-func",
            "first",
            "--as-json",
        ],
        None,
        None,
    );
    let value = parse_envelope(&result);
    let teams: Vec<&str> = rows(&value).iter().map(|r| r["team"].as_str().unwrap()).collect();
    assert_eq!(teams, vec!["red", "blue", "green"]);
}

#[test]
fn test_end_to_end_x_select_containment() {
    let allowed = ["North", "East"];
    let result = run_tablechart(
        &[
            "--data",
            "test/sales.csv",
            "--x-axis",
            "region",
            "--y-axis",
            "units",
            "--x-select",
            "North",
            "East",
            "--as-json",
        ],
        None,
        None,
    );
    let value = parse_envelope(&result);
    let regions: Vec<&str> = rows(&value).iter().map(|r| r["region"].as_str().unwrap()).collect();
    assert_eq!(regions.len(), 2);
    assert!(regions.iter().all(|r| allowed.contains(r)));
}

#[test]
fn test_end_to_end_missing_file() {
    let result = run_tablechart(
        &["--data", "test/does_not_exist.csv", "--x-axis", "a", "--y-axis", "b"],
        None,
        None,
    );
    assert_eq!(result.code, Some(1));
    assert_eq!(result.stderr, "No se ha encontrado el fichero especificado");
}

#[test]
fn test_end_to_end_unknown_column() {
    let result = run_tablechart(&["--x-axis", "foo", "--y-axis", "b"], Some("a,b\n1,2\n"), None);
    assert_eq!(result.code, Some(1));
    assert_eq!(result.stderr, "Seleccione un valor del listado para X axis: ['a', 'b']");
}

#[test]
fn test_end_to_end_multi_axis_conflict() {
    let result = run_tablechart(
        &["--x-axis", "a", "b", "--y-axis", "c", "d"],
        Some("a,b,c,d\n1,2,3,4\n"),
        None,
    );
    assert_eq!(result.code, Some(1));
    assert_eq!(result.stderr, "Sólo puede especificar múltiples campos para un eje");
}

#[test]
fn test_end_to_end_no_data_source() {
    let result = run_tablechart(&["--x-axis", "a", "--y-axis", "b"], None, None);
    assert_eq!(result.code, Some(1));
    assert_eq!(
        result.stderr,
        "Especifique el contenido de los datos mediante el argumento --data o < NOMBRE FICHERO"
    );
}

#[test]
fn test_end_to_end_malformed_json() {
    let result = run_tablechart(&["--x-axis", "a", "--y-axis", "b"], Some("[{\"a\": 1,"), None);
    assert_eq!(result.code, Some(1));
    assert!(result.stderr.starts_with("No se han podido interpretar los datos"));
}

#[test]
fn test_end_to_end_oversized_canvas_is_an_error() {
    let result = run_tablechart(
        &[
            "--x-axis",
            "a",
            "--y-axis",
            "b",
            "--width",
            "100000",
            "--height",
            "100000",
            "--as-json",
        ],
        Some("a,b\n1,2\n"),
        None,
    );
    assert_eq!(result.code, Some(1));
    assert!(result.stderr.contains("exceeds the limit"), "{}", result.stderr);
}
