//! Header extraction for files carrying resistance keywords.
//!
//! Locates the header row, decides which leading rows to skip when the
//! table is materialized and reconciles the header with the table width.

use crate::config::AnalysisConfig;
use crate::constants::labels;
use crate::models::ColumnNameSet;
use crate::source::RawContent;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Leading word run of a header cell
static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w']+").expect("word pattern is a valid regex"));

/// Keyword hits at which a duplicated header or units row is assumed
const REPEATED_HEADER_HITS: usize = 4;

/// Result of the header scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderScan {
    /// Row indices excluded when the table is materialized
    pub skip_rows: Vec<usize>,
    /// Cleaned cells of the last keyword row
    pub header: Vec<String>,
}

/// Header labels reconciled with the table width
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHeader {
    pub columns: ColumnNameSet,
    pub skip_rows: Vec<usize>,
}

fn clean_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    WORD_PATTERN
        .find(token)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Find the header row and the rows to skip
///
/// Rows before the first keyword row are skipped, plus the row after the
/// last of them. Four or more keyword hits mean a repeated header or a
/// units row, so two more rows are skipped.
pub fn find_skip_rows(content: &RawContent, config: &AnalysisConfig) -> HeaderScan {
    let mut skip_rows: Vec<usize> = Vec::new();
    let mut header = Vec::new();
    let mut keyword_hits = 0;

    for (index, tokens) in content.header_tokens().iter().enumerate() {
        let cleaned: Vec<String> = tokens.iter().map(|t| clean_token(t)).collect();

        for keyword in &config.keywords {
            if cleaned.iter().any(|token| token == keyword) {
                keyword_hits += 1;
                header = cleaned.clone();
            }
        }

        if keyword_hits == 0 {
            skip_rows.push(index);
        }
    }

    if keyword_hits == 0 {
        return HeaderScan::default();
    }

    let next = skip_rows.last().map_or(0, |last| last + 1);
    skip_rows.push(next);
    if keyword_hits >= REPEATED_HEADER_HITS {
        skip_rows.extend([next + 1, next + 2]);
    }

    debug!(
        "Header scan: {} keyword hits, skip rows {:?}, header {:?}",
        keyword_hits, skip_rows, header
    );
    HeaderScan { skip_rows, header }
}

/// Normalize one header label; later rules win
fn normalize_label(index: usize, raw: &str) -> String {
    if raw.is_empty() {
        return format!("{}{}", labels::HEADER_PREFIX, index);
    }

    let mut label = raw.trim_matches('\n').to_string();
    if raw.contains('X') {
        label = labels::X.to_string();
    }
    if raw.contains('Y') {
        label = labels::Y.to_string();
    }
    if raw.contains("Resistance") {
        label = labels::R.to_string();
    }
    label
}

/// Resolve column names from the header row
///
/// Missing trailing labels up to `expected_width` are filled with
/// `unknown_0`, `unknown_1`, ... so a file whose keywords never form a
/// header row still gets one label per column.
pub fn extract(content: &RawContent, expected_width: Option<usize>, config: &AnalysisConfig) -> ExtractedHeader {
    let HeaderScan { skip_rows, mut header } = find_skip_rows(content, config);

    if let Some(width) = expected_width {
        let diff = width.saturating_sub(header.len());
        header.extend((0..diff).map(|i| format!("{}{}", labels::UNKNOWN_PREFIX, i)));
    }

    let columns = ColumnNameSet::new(
        header
            .iter()
            .enumerate()
            .map(|(index, raw)| normalize_label(index, raw))
            .collect(),
    );
    debug!("Extracted columns {}", columns);
    ExtractedHeader { columns, skip_rows }
}
