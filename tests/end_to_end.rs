//! End-to-end tests over staged measurement files
//!
//! Each test writes a realistic instrument export into a temporary
//! directory and runs it through the public analyzer API.

use fourpp_processor::constants::verdict;
use fourpp_processor::formatter::{AreaPayload, DataRow, DataTableResponse, OverallPayload};
use fourpp_processor::models::{MeasurementFile, TemperatureCategory};
use fourpp_processor::{
    AnalysisConfig, Analyzer, MeasurementType, MissingValuePolicy, ProcessorError, SweepProcessor,
    ValidationVerdict,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Grid of a complete materials library: 18 columns by 19 rows
const GRID_COLUMNS: usize = 18;
const GRID_ROWS: usize = 19;

fn stage(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Coordinate rows `x,y,R1,R2,R3` with replicates within a few percent
fn triplicate_rows(areas: usize, delimiter: &str) -> Vec<String> {
    (0..areas)
        .map(|i| {
            let (col, row) = (i % GRID_COLUMNS, i / GRID_COLUMNS);
            let x = col as f64 * 4.5 - 38.25;
            let y = row as f64 * 4.5 - 40.5;
            let base = 100.0 + i as f64;
            [x, y, base, base * 1.02, base * 0.99]
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(delimiter)
        })
        .collect()
}

fn triplicate_csv(areas: usize) -> String {
    let mut lines = vec!["x,y,R1,R2,R3".to_string()];
    lines.extend(triplicate_rows(areas, ","));
    lines.join("\n") + "\n"
}

fn row_keys(row: &DataRow) -> Vec<&str> {
    row.0.iter().map(|(name, _)| name.as_str()).collect()
}

#[test]
fn test_complete_library_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "lib_RT/library_01.csv", &triplicate_csv(GRID_COLUMNS * GRID_ROWS));
    let analyzer = Analyzer::default();

    assert_eq!(analyzer.validate(&path).unwrap(), ValidationVerdict::ok(None));
    assert_eq!(analyzer.measurement_type(&path).unwrap(), MeasurementType::Triplicate);

    let response: DataTableResponse = analyzer.data_table(&path).unwrap();
    assert_eq!(response.data_table.len(), 342);
    assert_eq!(
        row_keys(&response.data_table[0]),
        vec!["x", "y", "R1", "R2", "R3", "R_ave", "R_median"]
    );

    let file = MeasurementFile::new(&path).unwrap();
    assert_eq!(file.temperature_category(), TemperatureCategory::RoomTemperature);
}

#[test]
fn test_incomplete_library_reports_area_count() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "partial.csv", &triplicate_csv(300));
    let analyzer = Analyzer::default();

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::AREA_COUNT_MISMATCH);
    assert!(result.message.as_deref().unwrap().contains("more or less than 342"));
    assert_eq!(result.warning, None);

    assert!(matches!(
        analyzer.area_payload(&path),
        Err(ProcessorError::AreaCountMismatch { expected: 342, found: 300 })
    ));
}

#[test]
fn test_unrecognized_layout_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let content: String = (0..12).map(|i| format!("{}.5 2.25 3.75\n", i)).collect();
    let path = stage(temp_dir.path(), "three_columns.txt", &content);
    let analyzer = Analyzer::default();

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::COLUMNS_UNRESOLVED);
    assert_eq!(result.message.as_deref(), Some(verdict::COLUMNS_UNRESOLVED_MESSAGE));
    assert!(verdict::COLUMNS_UNRESOLVED_MESSAGE.contains("measurement R, in case of"));
    assert_eq!(result.warning, None);

    assert!(matches!(
        analyzer.resolve_columns(&path),
        Err(ProcessorError::ColumnsUnresolved { .. })
    ));
}

#[test]
fn test_sparse_file_has_no_table() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "notes.txt", "Sample 17\nmeasured by hand\n1.0 2.0\n");
    let analyzer = Analyzer::default();

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::NO_TABLE);
    assert!(matches!(analyzer.table(&path), Err(ProcessorError::NoTableFound { .. })));
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = Analyzer::default().validate(temp_dir.path().join("absent.csv"));
    assert!(matches!(result, Err(ProcessorError::FileNotFound { .. })));
}

fn temperature_csv() -> String {
    let mut content = String::from("Library 7 heating run\nMA,T_set,R\n");
    for t_set in [25, 50, 75] {
        for ma in 1..=4 {
            content.push_str(&format!("{},{},{}\n", ma, t_set, ma * 10 + t_set / 25));
        }
    }
    content
}

#[test]
fn test_temperature_dependent_payloads() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "lib_MA_heating.csv", &temperature_csv());
    let analyzer = Analyzer::default();

    let resolved = analyzer.resolve_columns(&path).unwrap();
    assert_eq!(resolved.skip_rows, vec![0, 1]);
    assert!(!resolved.inferred);
    assert_eq!(
        analyzer.measurement_type(&path).unwrap(),
        MeasurementType::SingleTemperatureDependent
    );
    assert_eq!(analyzer.validate(&path).unwrap(), ValidationVerdict::ok(None));

    let overall: OverallPayload = analyzer.overall_payload(&path).unwrap();
    let json = serde_json::to_value(&overall).unwrap();
    let properties = json["Properties"].as_array().unwrap();
    assert_eq!(properties.len(), 9);
    assert_eq!(properties[0]["Name"], "Temperature");
    assert_eq!(properties[0]["Value"], json!(25.0));
    assert_eq!(properties[1]["Value"], json!(11.0));
    assert_eq!(properties[2]["Value"], json!(41.0));
    assert_eq!(properties[8]["Value"], json!(43.0));
    assert_eq!(properties[8]["Row"], 3);

    let areas: AreaPayload = analyzer.area_payload(&path).unwrap();
    assert_eq!(areas.compositions_for_sample_update.len(), 4);
    let json = serde_json::to_value(&areas).unwrap();
    let library = json["Properties"].as_array().unwrap();
    assert_eq!(library.len(), 4);
    assert_eq!(library[0]["Value"], json!(11.0));
    assert!(library[0]["Comment"].as_str().unwrap().ends_with("at T= 25.0"));
    assert_eq!(library[1]["Value"], json!(43.0));
    assert!(library[1]["Comment"].as_str().unwrap().ends_with("at T= 75.0"));
    assert_eq!(library[2]["Name"], "T");
    assert_eq!(library[2]["Value"], json!(25));
    assert_eq!(library[3]["Value"], json!(75));

    let first = &json["CompositionsForSampleUpdate"][0];
    assert_eq!(first["Predicate"]["Properties"][0]["Value"], json!(1));
    // mean over 25, 50 and 75 degrees
    assert_eq!(first["Properties"][0]["Value"], json!(12.0));
}

#[test]
fn test_column_ranges_and_inspection() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "lib_MA_heating.csv", &temperature_csv());
    let analyzer = Analyzer::default();

    let ranges = analyzer.column_ranges(&path).unwrap();
    let t_set = ranges.iter().find(|r| r.name == "T_set").unwrap();
    assert_eq!((t_set.min, t_set.max), (Some(25.0), Some(75.0)));

    let inspection = analyzer.inspect(&path).unwrap();
    assert_eq!(inspection.temperature_category, TemperatureCategory::TemperatureDependent);
    assert_eq!(inspection.measurement_type, Some(MeasurementType::SingleTemperatureDependent));
    assert!(!inspection.sweep);
    assert_eq!(inspection.profile.expected_width(), Some(3));
}

fn headerless_text(with_gap: bool) -> String {
    let mut lines = triplicate_rows(12, "\t");
    if with_gap {
        let mut cells: Vec<&str> = lines[5].split('\t').collect();
        cells[3] = "n/a";
        lines[5] = cells.join("\t");
    }
    lines.join("\n") + "\n"
}

#[test]
fn test_headerless_text_is_inferred() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "export.txt", &headerless_text(false));
    let analyzer = Analyzer::new(AnalysisConfig::default().with_expected_area_count(12));

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::OK);
    assert_eq!(result.warning.as_deref(), Some(verdict::INFERRED_COLUMNS_WARNING));

    let resolved = analyzer.resolve_columns(&path).unwrap();
    assert!(resolved.inferred);
    assert_eq!(resolved.columns.labels(), &["x", "y", "R1", "R2", "R3"]);
}

#[test]
fn test_missing_value_policies() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "gappy.txt", &headerless_text(true));

    let dropping = Analyzer::default();
    assert_eq!(dropping.table(&path).unwrap().row_count(), 11);

    let coercing = Analyzer::new(
        AnalysisConfig::default().with_missing_value_policy(MissingValuePolicy::CoerceToMissing),
    );
    let table = coercing.table(&path).unwrap();
    assert_eq!(table.row_count(), 12);
    assert_eq!(table.column("R2").unwrap().iter().filter(|v| v.is_none()).count(), 1);
}

/// Minimal stand-in for the external sweep processor
struct FixedSweep;

impl SweepProcessor for FixedSweep {
    fn validate(&self, _file: &MeasurementFile) -> fourpp_processor::Result<ValidationVerdict> {
        Ok(ValidationVerdict::ok(Some("sweep".to_string())))
    }

    fn data_table(&self, _file: &MeasurementFile) -> fourpp_processor::Result<DataTableResponse> {
        Ok(DataTableResponse { data_table: Vec::new() })
    }

    fn area_payload(&self, file: &MeasurementFile) -> fourpp_processor::Result<AreaPayload> {
        Err(ProcessorError::SweepFile {
            path: file.path().to_path_buf(),
        })
    }

    fn overall_payload(&self, _file: &MeasurementFile) -> fourpp_processor::Result<OverallPayload> {
        Ok(OverallPayload {
            delete_previous_properties: true,
            properties: Vec::new(),
        })
    }
}

fn sweep_file(dir: &Path) -> PathBuf {
    let line: Vec<String> = (0..343).map(|i| format!("{}.5", i)).collect();
    let content = vec![line.join(","); 10].join("\n") + "\n";
    stage(dir, "sweep.csv", &content)
}

#[test]
fn test_sweep_files_are_routed() {
    let temp_dir = TempDir::new().unwrap();
    let path = sweep_file(temp_dir.path());

    let bare = Analyzer::default();
    assert!(matches!(bare.validate(&path), Err(ProcessorError::SweepFile { .. })));
    assert!(bare.inspect(&path).unwrap().sweep);

    let routed = Analyzer::default().with_sweep_processor(Arc::new(FixedSweep));
    let result = routed.validate(&path).unwrap();
    assert_eq!(result.warning.as_deref(), Some("sweep"));
    assert!(routed.data_table(&path).unwrap().data_table.is_empty());
    assert!(routed.overall_payload(&path).unwrap().properties.is_empty());
}

#[test]
fn test_tab_separated_header_without_area_key() {
    let temp_dir = TempDir::new().unwrap();
    let mut lines = vec!["x\ty\tR1\tR2\tR3".to_string()];
    lines.extend(triplicate_rows(GRID_COLUMNS * GRID_ROWS, "\t"));
    let path = stage(temp_dir.path(), "lib_tab.txt", &(lines.join("\n") + "\n"));
    let analyzer = Analyzer::default();

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::COLUMNS_UNRESOLVED);
    assert_eq!(result.message.as_deref(), Some(verdict::NO_COORDINATE_MESSAGE));

    let resolved = analyzer.resolve_columns(&path).unwrap();
    assert!(!resolved.inferred);
    assert_eq!(
        resolved.columns.labels(),
        &["unknown_0", "unknown_1", "unknown_2", "unknown_3", "unknown_4"]
    );
}

#[test]
fn test_titled_export_without_header_row() {
    let temp_dir = TempDir::new().unwrap();
    let content = format!("Run 7 Resistance scan\n{}", headerless_text(false));
    let path = stage(temp_dir.path(), "run_07.txt", &content);
    let analyzer = Analyzer::new(AnalysisConfig::default().with_expected_area_count(12));

    let result = analyzer.validate(&path).unwrap();
    assert_eq!(result.code, verdict::COLUMNS_UNRESOLVED);
    assert_eq!(result.message.as_deref(), Some(verdict::NO_COORDINATE_MESSAGE));
    assert_eq!(result.warning, None);
}

#[test]
fn test_replicate_tolerance_controls_inference() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(temp_dir.path(), "export.txt", &headerless_text(false));

    // replicates spread by up to 2% around their mean
    let strict = Analyzer::new(
        AnalysisConfig::default()
            .with_expected_area_count(12)
            .with_relative_error_percent(1.0),
    );
    let result = strict.validate(&path).unwrap();
    assert_eq!(result.code, verdict::COLUMNS_UNRESOLVED);
    assert_eq!(result.message.as_deref(), Some(verdict::COLUMNS_UNRESOLVED_MESSAGE));

    let tolerant = Analyzer::new(
        AnalysisConfig::default()
            .with_expected_area_count(12)
            .with_relative_error_percent(2.5),
    );
    assert_eq!(tolerant.validate(&path).unwrap().code, verdict::OK);
}

#[test]
fn test_histogram_line_cap_limits_profile() {
    let temp_dir = TempDir::new().unwrap();
    let content = "0.5\t1.5\n".repeat(8) + &headerless_text(false);
    let path = stage(temp_dir.path(), "calibrated.txt", &content);

    let full = Analyzer::new(AnalysisConfig::default().with_expected_area_count(12));
    assert_eq!(full.profile(&path).unwrap().widths, vec![(2, 8), (5, 12)]);
    assert_eq!(full.validate(&path).unwrap().code, verdict::OK);

    // sampling stops inside the calibration block
    let capped = Analyzer::new(
        AnalysisConfig::default()
            .with_expected_area_count(12)
            .with_histogram_line_cap(6),
    );
    assert_eq!(capped.profile(&path).unwrap().widths, vec![(2, 7)]);
    assert_eq!(capped.validate(&path).unwrap().code, verdict::COLUMNS_UNRESOLVED);
}

/// Workbook with header `MA,x,y,R1,R2,R3` and 342 areas; the first R2
/// cell is stored as the text "101,5"
fn workbook_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/library_ma.xlsx")
}

#[test]
fn test_workbook_library_is_valid() {
    let path = workbook_fixture();
    let analyzer = Analyzer::default();

    assert_eq!(analyzer.validate(&path).unwrap(), ValidationVerdict::ok(None));
    assert_eq!(analyzer.measurement_type(&path).unwrap(), MeasurementType::Triplicate);

    let resolved = analyzer.resolve_columns(&path).unwrap();
    assert_eq!(resolved.columns.labels(), &["MA", "x", "y", "R1", "R2", "R3"]);
    assert_eq!(resolved.skip_rows, vec![0]);

    let table = analyzer.table(&path).unwrap();
    assert_eq!(table.row_count(), 342);
    assert_eq!(table.value("MA", 0), Some(1.0));
    assert_eq!(table.value("R2", 0), Some(101.5));
    assert_eq!(table.value("R1", 341), Some(441.0));
}
