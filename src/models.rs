//! Core data structures for measurement file analysis.
//!
//! Defines the file identity, resolved column labels, measurement shapes
//! and the validation verdict handed back to callers.

use crate::constants::{CSV_EXTENSIONS, SPREADSHEET_EXTENSIONS, labels, verdict};
use crate::error::{ProcessorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How the raw content of a file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Comma-separated text
    Csv,
    /// Whitespace-delimited text
    Text,
    /// Workbook read through calamine
    Spreadsheet,
}

impl SourceKind {
    /// Pick the reader for a lowercase extension without the leading dot
    pub fn from_extension(extension: &str) -> Self {
        if CSV_EXTENSIONS.contains(&extension) {
            SourceKind::Csv
        } else if SPREADSHEET_EXTENSIONS.contains(&extension) {
            SourceKind::Spreadsheet
        } else {
            SourceKind::Text
        }
    }
}

/// Temperature category encoded in file and directory names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureCategory {
    RoomTemperature,
    TemperatureDependent,
    Unknown,
}

/// A measurement file staged on disk
///
/// Immutable once constructed. The analyzer reads the content once through
/// [`crate::source::load`] and hands it to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementFile {
    path: PathBuf,
    extension: String,
    base_name: String,
    dir_name: String,
}

impl MeasurementFile {
    /// Describe a file, failing when the path is not a readable regular file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ProcessorError::FileNotFound { path });
        }

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let base_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir_name = path
            .canonicalize()
            .ok()
            .and_then(|full| full.parent().and_then(|p| p.file_name()).map(|n| n.to_os_string()))
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            extension,
            base_name,
            dir_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the leading dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name without directory and extension
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Name of the directory holding the file
    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::from_extension(&self.extension)
    }

    /// Detect the temperature category from `_`-separated name tokens
    ///
    /// `RT` in the file or directory name marks room temperature; `MA` in the
    /// file name marks a temperature-dependent measurement.
    pub fn temperature_category(&self) -> TemperatureCategory {
        let has_token = |name: &str, token: &str| name.split('_').any(|part| part == token);

        if has_token(&self.base_name, "RT") || has_token(&self.dir_name, "RT") {
            TemperatureCategory::RoomTemperature
        } else if has_token(&self.base_name, "MA") {
            TemperatureCategory::TemperatureDependent
        } else {
            TemperatureCategory::Unknown
        }
    }
}

/// Ordered column labels of a measurement table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNameSet(Vec<String>);

impl ColumnNameSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn from_labels(labels: &[&str]) -> Self {
        Self(labels.iter().map(|label| label.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// Position of the first column carrying `label`
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn rename(&mut self, index: usize, label: &str) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = label.to_string();
        }
    }

    /// True when a measurement area can be identified (`MA`, or both `x` and `y`)
    pub fn has_area_key(&self) -> bool {
        self.contains(labels::MA) || (self.contains(labels::X) && self.contains(labels::Y))
    }
}

impl fmt::Display for ColumnNameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Column labels resolved for one file, with the rows to skip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub columns: ColumnNameSet,
    pub skip_rows: Vec<usize>,
    /// True when the labels were synthesized from cell content
    pub inferred: bool,
}

/// Measurement shape derived from the resolved column labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementType {
    /// `R1,R2,R3` recorded at several set temperatures
    TriplicateTemperatureDependent,
    /// `R1,R2,R3` at room temperature
    Triplicate,
    /// Single `R` recorded at several set temperatures
    SingleTemperatureDependent,
    /// Single `R` at room temperature
    Single,
    Unknown,
}

impl MeasurementType {
    pub fn tag(&self) -> &'static str {
        match self {
            MeasurementType::TriplicateTemperatureDependent => "R1_R2_R3_temperature_dependent",
            MeasurementType::Triplicate => "R1_R2_R3",
            MeasurementType::SingleTemperatureDependent => "R_temperature_dependent",
            MeasurementType::Single => "R",
            MeasurementType::Unknown => "unknown",
        }
    }

    pub fn is_temperature_dependent(&self) -> bool {
        matches!(
            self,
            MeasurementType::TriplicateTemperatureDependent
                | MeasurementType::SingleTemperatureDependent
        )
    }

    pub fn is_triplicate(&self) -> bool {
        matches!(
            self,
            MeasurementType::TriplicateTemperatureDependent | MeasurementType::Triplicate
        )
    }

    /// One-hot view used by diagnostics output
    pub fn flags(&self) -> [(&'static str, u8); 5] {
        let flag = |kind: MeasurementType| u8::from(*self == kind);
        [
            (
                "type_R1_R2_R3_temperature_dependant",
                flag(MeasurementType::TriplicateTemperatureDependent),
            ),
            ("type_R1_R2_R3", flag(MeasurementType::Triplicate)),
            (
                "type_R_temperature_dependant",
                flag(MeasurementType::SingleTemperatureDependent),
            ),
            ("type_R", flag(MeasurementType::Single)),
            ("new_type", flag(MeasurementType::Unknown)),
        ]
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Structured outcome of [`crate::validator::file_validation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationVerdict {
    pub code: i32,
    pub message: Option<String>,
    pub warning: Option<String>,
}

impl ValidationVerdict {
    pub fn ok(warning: Option<String>) -> Self {
        Self {
            code: verdict::OK,
            message: None,
            warning,
        }
    }

    pub fn failure(code: i32, message: &str) -> Self {
        Self {
            code,
            message: Some(message.to_string()),
            warning: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.code == verdict::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_found() {
        let result = MeasurementFile::new("/definitely/not/here.csv");
        assert!(matches!(result, Err(ProcessorError::FileNotFound { .. })));
    }

    #[test]
    fn test_file_identity() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sample_RT_batch");
        fs::create_dir(&sub).unwrap();
        let path = sub.join("wafer_12.CSV");
        fs::write(&path, "x,y,R\n").unwrap();

        let file = MeasurementFile::new(&path).unwrap();
        assert_eq!(file.extension(), "csv");
        assert_eq!(file.base_name(), "wafer_12");
        assert_eq!(file.dir_name(), "sample_RT_batch");
        assert_eq!(file.kind(), SourceKind::Csv);
        assert_eq!(file.temperature_category(), TemperatureCategory::RoomTemperature);
    }

    #[test]
    fn test_temperature_category_from_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib_MA_heating.txt");
        fs::write(&path, "").unwrap();
        let file = MeasurementFile::new(&path).unwrap();
        assert_eq!(file.temperature_category(), TemperatureCategory::TemperatureDependent);
        assert_eq!(file.kind(), SourceKind::Text);

        let path = dir.path().join("lib_MAP.xlsx");
        fs::write(&path, "").unwrap();
        let file = MeasurementFile::new(&path).unwrap();
        assert_eq!(file.temperature_category(), TemperatureCategory::Unknown);
        assert_eq!(file.kind(), SourceKind::Spreadsheet);
    }

    #[test]
    fn test_measurement_type_flags() {
        let flags = MeasurementType::Single.flags();
        assert_eq!(flags.iter().filter(|(_, v)| *v == 1).count(), 1);
        assert_eq!(flags[3], ("type_R", 1));
        assert!(MeasurementType::TriplicateTemperatureDependent.is_triplicate());
        assert!(!MeasurementType::Triplicate.is_temperature_dependent());
    }

    #[test]
    fn test_area_key_needs_ma_or_both_coordinates() {
        assert!(ColumnNameSet::from_labels(&["MA", "R"]).has_area_key());
        assert!(ColumnNameSet::from_labels(&["x", "y", "R"]).has_area_key());
        assert!(!ColumnNameSet::from_labels(&["x", "R"]).has_area_key());
        assert!(!ColumnNameSet::from_labels(&["T_set", "R"]).has_area_key());
    }

    #[test]
    fn test_verdict_serializes_pascal_case() {
        let verdict = ValidationVerdict::ok(None);
        let json = serde_json::to_string(&verdict).unwrap();
        assert_eq!(json, r#"{"Code":0,"Message":null,"Warning":null}"#);
    }
}
