//! Keyword and shape scanning.
//!
//! Counts resistance keywords and builds a histogram of how many cells per
//! line parse as numbers. The histogram is the only structural signal most
//! instrument exports carry, so every later stage branches on it.

use crate::config::AnalysisConfig;
use crate::constants::{KEYWORD_ENTRY, MIN_PROFILE_ENTRIES};
use crate::models::SourceKind;
use crate::source::{RawContent, parse_float, split_cells};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Keyword occurrences plus the surviving floatable-column counts
///
/// `widths` keeps first-appearance order; the first entry is the table
/// width used by the column stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordShapeProfile {
    pub keyword_count: usize,
    pub widths: Vec<(usize, usize)>,
}

impl KeywordShapeProfile {
    /// Number of mapping entries, counting the keyword entry
    pub fn entry_count(&self) -> usize {
        1 + self.widths.len()
    }

    /// Whether the file holds a discernible table
    pub fn has_table(&self) -> bool {
        self.entry_count() >= MIN_PROFILE_ENTRIES
    }

    pub fn has_keywords(&self) -> bool {
        self.keyword_count > 0
    }

    /// First surviving floatable-column count
    pub fn expected_width(&self) -> Option<usize> {
        self.widths.first().map(|(width, _)| *width)
    }
}

impl fmt::Display for KeywordShapeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"{}\": {}", KEYWORD_ENTRY, self.keyword_count)?;
        for (width, frequency) in &self.widths {
            write!(f, ", {}: {}", width, frequency)?;
        }
        write!(f, "}}")
    }
}

/// Build the profile for already-loaded content
pub fn scan(content: &RawContent, kind: SourceKind, config: &AnalysisConfig) -> KeywordShapeProfile {
    let (keyword_count, float_counts) = match content {
        RawContent::Text(lines) => scan_lines(lines, kind, config),
        RawContent::Sheet(rows) => scan_columns(rows, config),
    };

    let profile = KeywordShapeProfile {
        keyword_count,
        widths: recurring_widths(&float_counts, config.min_width_recurrence),
    };
    debug!("Keyword/shape profile: {}", profile);
    profile
}

fn keyword_hits(text: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|word| text.contains(word.as_str())).count()
}

fn scan_lines(lines: &[String], kind: SourceKind, config: &AnalysisConfig) -> (usize, Vec<usize>) {
    let mut keyword_count = 0;
    let mut float_counts = Vec::new();

    for line in lines {
        keyword_count += keyword_hits(line, &config.keywords);

        let floatable = split_cells(line, kind)
            .into_iter()
            .filter(|cell| parse_float(cell).is_some())
            .count();
        if floatable > 1 {
            float_counts.push(floatable);
            if float_counts.len() > config.histogram_line_cap {
                break;
            }
        }
    }

    (keyword_count, float_counts)
}

/// Worksheets are profiled per column: the first row is the header, the
/// body is searched for keywords too since some sheets put them there.
fn scan_columns(rows: &[Vec<String>], config: &AnalysisConfig) -> (usize, Vec<usize>) {
    let mut keyword_count = 0;
    let mut float_counts = Vec::new();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    for column in 0..width {
        let mut cells = rows.iter().map(|row| row.get(column).map(String::as_str).unwrap_or(""));
        let header = cells.next().unwrap_or("");
        keyword_count += keyword_hits(header, &config.keywords);

        let mut floatable = 0;
        for cell in cells {
            if parse_float(cell).is_some() {
                floatable += 1;
            } else {
                keyword_count += keyword_hits(cell, &config.keywords);
            }
        }

        if floatable > 1 {
            float_counts.push(floatable);
            if float_counts.len() > config.histogram_line_cap {
                break;
            }
        }
    }

    (keyword_count, float_counts)
}

/// Keep counts recurring more than `min_recurrence` times, in first-seen order
fn recurring_widths(float_counts: &[usize], min_recurrence: usize) -> Vec<(usize, usize)> {
    let mut widths: Vec<(usize, usize)> = Vec::new();
    for &count in float_counts {
        if widths.iter().any(|(width, _)| *width == count) {
            continue;
        }
        let frequency = float_counts.iter().filter(|&&c| c == count).count();
        if frequency > min_recurrence {
            widths.push((count, frequency));
        }
    }
    widths
}
