//! Per-file analysis pipeline.
//!
//! [`Analyzer`] threads one file through loading, scanning, column
//! resolution, classification and table building. Files as wide as the
//! temperature-sweep format are routed to a registered [`SweepProcessor`]
//! before any heuristic runs.

use crate::aggregate::{self, MeasurementAreaIndex};
use crate::classifier::classify;
use crate::config::AnalysisConfig;
use crate::error::{ProcessorError, Result};
use crate::extractor;
use crate::formatter::{self, AreaPayload, DataTableResponse, OverallPayload};
use crate::models::{
    MeasurementFile, MeasurementType, ResolvedColumns, TemperatureCategory, ValidationVerdict,
};
use crate::scanner::{self, KeywordShapeProfile};
use crate::source::{self, RawContent};
use crate::synthesizer;
use crate::table::{self, ColumnRange, NormalizedTable};
use crate::validator;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Processor for the fixed-schema cyclic temperature-sweep format
///
/// Implementations live outside this crate; the analyzer only decides when
/// a file belongs to them.
pub trait SweepProcessor: Send + Sync {
    fn validate(&self, file: &MeasurementFile) -> Result<ValidationVerdict>;
    fn data_table(&self, file: &MeasurementFile) -> Result<DataTableResponse>;
    fn area_payload(&self, file: &MeasurementFile) -> Result<AreaPayload>;
    fn overall_payload(&self, file: &MeasurementFile) -> Result<OverallPayload>;
}

/// Loaded content and shape profile of one file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file: MeasurementFile,
    pub content: RawContent,
    pub profile: KeywordShapeProfile,
}

impl FileAnalysis {
    /// Table width: the sheet width for workbooks, else the first profile key
    pub fn table_width(&self) -> Option<usize> {
        self.content.sheet_width().or_else(|| self.profile.expected_width())
    }

    /// Widths considered when guessing a header-less layout
    fn candidate_widths(&self) -> Vec<usize> {
        match self.content.sheet_width() {
            Some(width) => vec![width],
            None => self.profile.widths.iter().map(|(width, _)| *width).collect(),
        }
    }
}

/// Outcome of column resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The profile has no width entry
    NoTable,
    /// Neither header extraction nor synthesis produced labels
    Unresolved,
    Resolved(ResolvedColumns),
}

/// Diagnostics for one file
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub path: String,
    pub temperature_category: TemperatureCategory,
    pub profile: KeywordShapeProfile,
    pub resolved: Option<ResolvedColumns>,
    pub measurement_type: Option<MeasurementType>,
    pub type_flags: Vec<(&'static str, u8)>,
    pub sweep: bool,
}

/// Stateless analyzer; safe to share between threads
#[derive(Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
    sweep: Option<Arc<dyn SweepProcessor>>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("sweep", &self.sweep.is_some())
            .finish()
    }
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config, sweep: None }
    }

    /// Register the processor handling temperature-sweep files
    pub fn with_sweep_processor(mut self, processor: Arc<dyn SweepProcessor>) -> Self {
        self.sweep = Some(processor);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load and scan a file
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<FileAnalysis> {
        let file = MeasurementFile::new(path)?;
        let content = source::load(&file)?;
        let profile = scanner::scan(&content, file.kind(), &self.config);
        Ok(FileAnalysis {
            file,
            content,
            profile,
        })
    }

    pub fn profile<P: AsRef<Path>>(&self, path: P) -> Result<KeywordShapeProfile> {
        Ok(self.open(path)?.profile)
    }

    /// True when the file has the width of the temperature-sweep format
    pub fn is_sweep(&self, analysis: &FileAnalysis) -> bool {
        analysis.table_width() == Some(self.config.sweep_column_count)
    }

    /// Registered sweep processor, or an error naming the file
    pub(crate) fn sweep_processor(&self, file: &MeasurementFile) -> Result<&dyn SweepProcessor> {
        self.sweep.as_deref().ok_or_else(|| ProcessorError::SweepFile {
            path: file.path().to_path_buf(),
        })
    }

    /// Resolve column labels from keywords or, failing that, cell content
    pub fn resolution(&self, analysis: &FileAnalysis) -> Resolution {
        if !analysis.profile.has_table() {
            return Resolution::NoTable;
        }

        let resolved = if analysis.profile.has_keywords() {
            let extracted = extractor::extract(&analysis.content, analysis.table_width(), &self.config);
            ResolvedColumns {
                columns: extracted.columns,
                skip_rows: extracted.skip_rows,
                inferred: false,
            }
        } else {
            ResolvedColumns {
                columns: synthesizer::synthesize(
                    &analysis.content,
                    analysis.file.kind(),
                    &analysis.candidate_widths(),
                    &self.config,
                ),
                skip_rows: Vec::new(),
                inferred: true,
            }
        };

        if resolved.columns.is_empty() {
            Resolution::Unresolved
        } else {
            debug!(
                "Resolved columns {} for {}",
                resolved.columns,
                analysis.file.path().display()
            );
            Resolution::Resolved(resolved)
        }
    }

    fn require_columns(&self, analysis: &FileAnalysis) -> Result<ResolvedColumns> {
        let path = || analysis.file.path().to_path_buf();
        match self.resolution(analysis) {
            Resolution::NoTable => Err(ProcessorError::NoTableFound { path: path() }),
            Resolution::Unresolved => Err(ProcessorError::ColumnsUnresolved { path: path() }),
            Resolution::Resolved(resolved) => Ok(resolved),
        }
    }

    pub fn resolve_columns<P: AsRef<Path>>(&self, path: P) -> Result<ResolvedColumns> {
        self.require_columns(&self.open(path)?)
    }

    pub fn measurement_type<P: AsRef<Path>>(&self, path: P) -> Result<MeasurementType> {
        Ok(classify(&self.resolve_columns(path)?.columns))
    }

    /// Build the normalized table; the file must have an area key and a
    /// known measurement type
    pub(crate) fn build_table(&self, analysis: &FileAnalysis) -> Result<NormalizedTable> {
        let resolved = self.require_columns(analysis)?;
        let columns = &resolved.columns;
        let path = || analysis.file.path().to_path_buf();

        if !columns.has_area_key() {
            return Err(ProcessorError::MissingAreaKey { path: path() });
        }

        let kind = classify(columns);
        if kind == MeasurementType::Unknown {
            return Err(ProcessorError::UnknownMeasurementType {
                path: path(),
                columns: columns.to_string(),
            });
        }

        table::build(&analysis.file, &analysis.content, &resolved, kind, &self.config)
    }

    pub fn table<P: AsRef<Path>>(&self, path: P) -> Result<NormalizedTable> {
        self.build_table(&self.open(path)?)
    }

    /// Validation verdict; see [`validator::file_validation`]
    pub fn validate<P: AsRef<Path>>(&self, path: P) -> Result<ValidationVerdict> {
        let analysis = self.open(path)?;
        if self.is_sweep(&analysis) {
            return self.sweep_processor(&analysis.file)?.validate(&analysis.file);
        }
        let verdict = validator::file_validation(self, &analysis)?;
        info!(
            "{}: verdict {}",
            analysis.file.path().display(),
            verdict.code
        );
        Ok(verdict)
    }

    pub fn data_table<P: AsRef<Path>>(&self, path: P) -> Result<DataTableResponse> {
        let analysis = self.open(path)?;
        if self.is_sweep(&analysis) {
            return self.sweep_processor(&analysis.file)?.data_table(&analysis.file);
        }
        Ok(formatter::data_table(&self.build_table(&analysis)?))
    }

    /// Per-area payload; coordinate files need the full set of areas
    pub fn area_payload<P: AsRef<Path>>(&self, path: P) -> Result<AreaPayload> {
        let analysis = self.open(path)?;
        if self.is_sweep(&analysis) {
            return self.sweep_processor(&analysis.file)?.area_payload(&analysis.file);
        }

        let table = self.build_table(&analysis)?;
        let areas = aggregate::area_stats(&table)?;
        let index = self.area_index(&table)?;
        Ok(formatter::area_payload(
            &table,
            &areas,
            &index,
            self.config.expected_area_count,
        ))
    }

    pub fn overall_payload<P: AsRef<Path>>(&self, path: P) -> Result<OverallPayload> {
        let analysis = self.open(path)?;
        if self.is_sweep(&analysis) {
            return self.sweep_processor(&analysis.file)?.overall_payload(&analysis.file);
        }

        let table = self.build_table(&analysis)?;
        if table.kind().is_temperature_dependent() {
            Ok(formatter::temperature_payload(&aggregate::temperature_stats(&table)?))
        } else {
            Ok(formatter::overall_payload(&aggregate::overall_stats(&table)?))
        }
    }

    pub fn area_index(&self, table: &NormalizedTable) -> Result<MeasurementAreaIndex> {
        aggregate::area_index(table, self.config.expected_area_count)
    }

    pub fn column_ranges<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ColumnRange>> {
        Ok(self.table(path)?.column_ranges())
    }

    /// Profile, columns and type of a file without failing on bad structure
    pub fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<Inspection> {
        let analysis = self.open(path)?;
        let sweep = self.is_sweep(&analysis);
        let resolved = match self.resolution(&analysis) {
            Resolution::Resolved(resolved) if !sweep => Some(resolved),
            _ => None,
        };
        let measurement_type = resolved.as_ref().map(|r| classify(&r.columns));

        Ok(Inspection {
            path: analysis.file.path().display().to_string(),
            temperature_category: analysis.file.temperature_category(),
            profile: analysis.profile.clone(),
            type_flags: measurement_type.map(|t| t.flags().to_vec()).unwrap_or_default(),
            resolved,
            measurement_type,
            sweep,
        })
    }
}
