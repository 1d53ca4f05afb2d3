//! Line-by-line diagnostics for a question-answer JSON-lines file.
use crate::qa_extractor::QaPair;
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

/// Characters of context shown on each side of the failing column.
const CONTEXT_RADIUS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    /// 1-based line number.
    pub line: usize,
    /// 1-based character column of the error.
    pub column: usize,
    pub message: String,
    pub context: String,
    /// Caret line aligned under `context`.
    pub pointer: String,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "line {}, column {}: {}", self.line, self.column, self.message)?;
        writeln!(f, "    {}", self.context)?;
        write!(f, "    {}", self.pointer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionReport {
    pub valid: usize,
    pub blank: usize,
    pub issues: Vec<LineIssue>,
}

impl InspectionReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn inspect_file(path: &Path) -> Result<InspectionReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(inspect_str(&content))
}

pub fn inspect_str(content: &str) -> InspectionReport {
    let mut report = InspectionReport::default();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            report.blank += 1;
            continue;
        }
        match serde_json::from_str::<QaPair>(line) {
            Ok(_) => report.valid += 1,
            Err(e) => report.issues.push(describe(index + 1, line, &e)),
        }
    }

    report
}

fn describe(line_number: usize, line: &str, error: &serde_json::Error) -> LineIssue {
    let chars: Vec<char> = line.chars().collect();
    // The parser reports a 1-based byte column; 0 means no position.
    let byte_offset = error.column().saturating_sub(1);
    let at = line
        .char_indices()
        .take_while(|(offset, _)| *offset < byte_offset)
        .count();
    let start = at.saturating_sub(CONTEXT_RADIUS);
    let end = (at + CONTEXT_RADIUS).min(chars.len());

    LineIssue {
        line: line_number,
        column: at + 1,
        message: error.to_string(),
        context: chars[start..end].iter().collect(),
        pointer: format!("{}^", " ".repeat(at - start)),
    }
}
