//! Grounding checks for generated question-answer pairs.
use crate::qa_extractor::QaPair;
use serde::Serialize;
use tracing::warn;

/// Fewer pairs than this on one page is worth a warning.
pub const MIN_EXPECTED_PAIRS: usize = 3;

/// Pairs shorter in total than this share of the source text are worth a warning.
pub const MIN_COVERAGE_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    /// Pairs whose answer occurs in the source text.
    pub grounded: usize,
    pub ungrounded: usize,
    /// Pairs with a blank question or answer.
    pub empty: usize,
    pub too_few: bool,
    /// The pairs together hold less than [`MIN_COVERAGE_RATIO`] of the
    /// source text's characters.
    pub too_short: bool,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.ungrounded == 0 && self.empty == 0 && !self.too_few && !self.too_short
    }
}

fn squash_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// True when `answer` occurs in `source`, ignoring all whitespace.
pub fn is_grounded(answer: &str, source: &str) -> bool {
    let needle = squash_whitespace(answer);
    !needle.is_empty() && squash_whitespace(source).contains(&needle)
}

pub fn validate_pairs(pairs: &[QaPair], source: &str) -> ValidationReport {
    let haystack = squash_whitespace(source);
    let pair_chars: usize = pairs
        .iter()
        .map(|p| visible_chars(&p.question) + visible_chars(&p.answer))
        .sum();
    let source_chars = haystack.chars().count();
    let mut report = ValidationReport {
        total: pairs.len(),
        too_few: pairs.len() < MIN_EXPECTED_PAIRS,
        too_short: (pair_chars as f64) < source_chars as f64 * MIN_COVERAGE_RATIO,
        ..Default::default()
    };

    for pair in pairs {
        if pair.question.trim().is_empty() || pair.answer.trim().is_empty() {
            report.empty += 1;
            continue;
        }
        if haystack.contains(&squash_whitespace(&pair.answer)) {
            report.grounded += 1;
        } else {
            report.ungrounded += 1;
        }
    }

    report
}

/// Applies the grounding policy to one page's pairs.
///
/// Empty records are always dropped. Ungrounded pairs are dropped when
/// `require_grounded` is set and kept with a warning otherwise.
pub fn retain_grounded(
    pairs: Vec<QaPair>,
    source: &str,
    require_grounded: bool,
) -> (Vec<QaPair>, ValidationReport) {
    let report = validate_pairs(&pairs, source);

    if report.too_few {
        warn!(
            "only {} question-answer pairs generated (expected at least {})",
            report.total, MIN_EXPECTED_PAIRS
        );
    }
    if report.too_short {
        warn!(
            "question-answer pairs cover less than {:.0}% of the source text",
            MIN_COVERAGE_RATIO * 100.0
        );
    }
    if report.ungrounded > 0 {
        warn!(
            "{} of {} answers do not occur in the source text{}",
            report.ungrounded,
            report.total,
            if require_grounded { ", dropping them" } else { "" }
        );
    }

    let kept = pairs
        .into_iter()
        .filter(|pair| !pair.question.trim().is_empty() && !pair.answer.trim().is_empty())
        .filter(|pair| !require_grounded || is_grounded(&pair.answer, source))
        .collect();

    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "失眠症是指尽管有适当的睡眠机会和环境，\n仍然对睡眠时间和质量感到不满足。";

    #[test]
    fn test_grounding_ignores_whitespace() {
        assert!(is_grounded("仍然对睡眠时间 和质量感到不满足", SOURCE));
        assert!(is_grounded("适当的睡眠机会和环境，仍然", SOURCE));
        assert!(!is_grounded("褪黑素可以治疗失眠", SOURCE));
        assert!(!is_grounded("   ", SOURCE));
    }

    #[test]
    fn test_report_counts() {
        let pairs = vec![
            QaPair::new("什么是失眠症？", "仍然对睡眠时间和质量感到不满足"),
            QaPair::new("如何治疗？", "褪黑素"),
            QaPair::new("", "失眠症"),
        ];
        let report = validate_pairs(&pairs, SOURCE);
        assert_eq!(
            report,
            ValidationReport {
                total: 3,
                grounded: 1,
                ungrounded: 1,
                empty: 1,
                too_few: false,
                too_short: false,
            }
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_too_few_pairs_flagged() {
        let pairs = vec![QaPair::new("q", "失眠症")];
        let report = validate_pairs(&pairs, SOURCE);
        assert!(report.too_few);
        assert_eq!(report.grounded, 1);
    }

    #[test]
    fn test_retain_keeps_ungrounded_by_default() {
        let pairs = vec![
            QaPair::new("a", "失眠症"),
            QaPair::new("b", "褪黑素"),
            QaPair::new("c", " "),
        ];
        let (kept, report) = retain_grounded(pairs, SOURCE, false);
        assert_eq!(kept.len(), 2);
        assert_eq!(report.empty, 1);
    }

    #[test]
    fn test_retain_drops_ungrounded_when_required() {
        let pairs = vec![QaPair::new("a", "失眠症"), QaPair::new("b", "褪黑素")];
        let (kept, report) = retain_grounded(pairs, SOURCE, true);
        assert_eq!(kept, vec![QaPair::new("a", "失眠症")]);
        assert_eq!(report.ungrounded, 1);
    }

    #[test]
    fn test_short_output_flagged() {
        let long_source = "失眠症是一种常见的睡眠障碍，表现为入睡困难、睡眠维持困难或早醒，并导致日间功能受损。";
        let short = validate_pairs(&[QaPair::new("什么是失眠症？", "睡眠障碍")], long_source);
        assert!(short.too_short);
        assert!(!short.is_clean());

        let covering = validate_pairs(
            &[QaPair::new(
                "失眠症有哪些表现？",
                "表现为入睡困难、睡眠维持困难或早醒，并导致日间功能受损",
            )],
            long_source,
        );
        assert!(!covering.too_short);
        assert!(!validate_pairs(&[], "").too_short);
    }
}
