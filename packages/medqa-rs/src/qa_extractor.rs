//! Recovery of question-answer records from free-form model output.
//!
//! Models wrap their JSON in prose and code fences, forget quotes around
//! keys, use single quotes and leave trailing commas. Extraction runs in
//! stages and returns the largest subset of records it can recover:
//!
//! 1. locate a JSON candidate with an ordered list of patterns (first match wins);
//! 2. parse it, and on failure parse it again after the repair rules;
//! 3. if that yields nothing, scan for individual `{...}` records.
//!
//! [`extract_qa_pairs`] never fails; [`try_extract_qa_pairs`] reports why
//! nothing was found.
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// One question-answer record.
///
/// Accepts the `human` / `assistant` key names used by chat-style datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(alias = "human")]
    pub question: String,
    #[serde(alias = "assistant")]
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON structure found in model output")]
    NoJson,
    #[error("JSON candidate could not be parsed even after repair: {0}")]
    Unparseable(#[source] serde_json::Error),
    #[error("JSON parsed but held no question-answer records")]
    NoRecords,
}

/// Candidate locators, tried in order.
const LOCATOR_PATTERNS: &[(&str, &str)] = &[
    ("fenced json array", r"```json\s*(\[.*?\])\s*```"),
    ("fenced array", r"```\s*(\[.*?\])\s*```"),
    ("bare array", r"(\[.*\])"),
    ("bare object", r"(\{.*\})"),
];

/// Finds single records when the surrounding structure is beyond repair.
const RECORD_PATTERN: &str =
    r"\{[^{}]*?(?:question|human)[^{}]*?(?:answer|assistant)[^{}]*\}";

/// A textual fix applied to a JSON candidate that failed to parse.
pub struct RepairRule {
    pub name: &'static str,
    regex: Regex,
    replacement: &'static str,
}

impl RepairRule {
    pub fn apply(&self, input: &str) -> String {
        self.regex.replace_all(input, self.replacement).into_owned()
    }
}

static LOCATORS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
static RECORD_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static REPAIR_RULES: OnceLock<Vec<RepairRule>> = OnceLock::new();

fn dotall(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .build()
        .ok()
}

fn get_locators() -> &'static [(&'static str, Regex)] {
    LOCATORS.get_or_init(|| {
        LOCATOR_PATTERNS
            .iter()
            .filter_map(|(name, pattern)| Some((*name, dotall(pattern)?)))
            .collect()
    })
}

fn get_record_regex() -> Option<&'static Regex> {
    RECORD_REGEX.get_or_init(|| dotall(RECORD_PATTERN)).as_ref()
}

/// The repair rules in application order.
pub fn repair_rules() -> &'static [RepairRule] {
    REPAIR_RULES.get_or_init(|| {
        [
            ("byte_order_mark", r"\x{FEFF}", ""),
            // {question: ...} -> {"question": ...}
            (
                "unquoted_keys",
                r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):",
                r#"${1}"${2}"${3}:"#,
            ),
            // 'text' -> "text", only when no double quote sits in between
            ("single_quotes", r#"'([^'"\n]*)'"#, r#""${1}""#),
            ("doubled_commas", r",(\s*,)+", ","),
            ("trailing_commas", r",\s*([}\]])", "${1}"),
        ]
        .into_iter()
        .filter_map(|(name, pattern, replacement)| {
            Some(RepairRule {
                name,
                regex: dotall(pattern)?,
                replacement,
            })
        })
        .collect()
    })
}

/// Applies every repair rule once, in order.
pub fn repair_json(candidate: &str) -> String {
    repair_rules()
        .iter()
        .fold(candidate.trim().to_string(), |acc, rule| rule.apply(&acc))
}

/// Extracts every recoverable record from `text`; empty when none parse.
pub fn extract_qa_pairs(text: &str) -> Vec<QaPair> {
    match try_extract_qa_pairs(text) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!("QA extraction failed: {}", e);
            Vec::new()
        }
    }
}

/// Like [`extract_qa_pairs`], but reports why nothing was recovered.
pub fn try_extract_qa_pairs(text: &str) -> Result<Vec<QaPair>, ExtractionError> {
    let mut failure = ExtractionError::NoJson;

    if let Some((pattern, candidate)) = locate_candidate(text) {
        debug!(pattern, chars = candidate.len(), "found JSON candidate");
        match parse_candidate(candidate) {
            Ok(value) => {
                let pairs = records_from_value(value);
                if !pairs.is_empty() {
                    return Ok(pairs);
                }
                failure = ExtractionError::NoRecords;
            }
            Err(e) => {
                debug!("candidate unparseable after repair: {}", e);
                failure = ExtractionError::Unparseable(e);
            }
        }
    }

    let scanned = scan_records(text);
    if scanned.is_empty() {
        Err(failure)
    } else {
        debug!(count = scanned.len(), "recovered records by scanning");
        Ok(scanned)
    }
}

fn locate_candidate(text: &str) -> Option<(&'static str, &str)> {
    get_locators().iter().find_map(|(name, regex)| {
        regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| (*name, m.as_str().trim()))
    })
}

fn parse_candidate(candidate: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(candidate).or_else(|_| serde_json::from_str(&repair_json(candidate)))
}

fn records_from_value(value: Value) -> Vec<QaPair> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(record_from_value).collect(),
        object @ Value::Object(_) => record_from_value(object).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn record_from_value(value: Value) -> Option<QaPair> {
    let pair: QaPair = serde_json::from_value(value).ok()?;
    let question = pair.question.trim();
    let answer = pair.answer.trim();
    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(QaPair::new(question, answer))
}

fn scan_records(text: &str) -> Vec<QaPair> {
    let Some(regex) = get_record_regex() else {
        return Vec::new();
    };
    regex
        .find_iter(text)
        .filter_map(|m| {
            let value = serde_json::from_str(&repair_json(m.as_str())).ok()?;
            record_from_value(value)
        })
        .collect()
}
