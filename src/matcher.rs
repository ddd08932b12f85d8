//! Intent matcher — scores incoming text against the action catalog.
//!
//! Two signals are combined per pattern:
//! - Sørensen–Dice similarity over character bigrams (whitespace removed),
//!   for loosely-worded requests;
//! - a containment floor: a pattern occurring verbatim in the search text
//!   scores at least 0.8, privileging exact phrasing over diffuse overlap.
//!
//! The single best `(action, score)` pair wins; ties keep the first-seen
//! entry, so catalog order is the tie-break. Pure function of catalog +
//! inputs + threshold.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::{ActionCatalog, ActionKind};

/// Effective score assigned when a pattern occurs as a literal substring.
const CONTAINMENT_FLOOR: f64 = 0.8;

/// Result of matching a message against the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentMatch {
    /// The selected action, if the best score cleared the threshold.
    pub action: Option<ActionKind>,
    /// The best score seen, whether or not it cleared the threshold.
    pub score: f64,
}

/// Threshold-gated fuzzy matcher over an [`ActionCatalog`].
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    catalog: ActionCatalog,
    threshold: f64,
}

impl IntentMatcher {
    pub fn new(catalog: ActionCatalog, threshold: f64) -> Self {
        Self { catalog, threshold }
    }

    /// Find the best matching action for a message's subject and body.
    pub fn match_intent(&self, subject: &str, body: &str) -> IntentMatch {
        let search_text = format!("{subject} {body}").to_lowercase();

        let mut best_action: Option<ActionKind> = None;
        let mut best_score = 0.0_f64;

        for entry in self.catalog.entries() {
            for pattern in &entry.patterns {
                let pattern_lower = pattern.to_lowercase();
                let similarity = dice_similarity(&pattern_lower, &search_text);
                let score = if search_text.contains(&pattern_lower) {
                    similarity.max(CONTAINMENT_FLOOR)
                } else {
                    similarity
                };

                // Strict > keeps the first-seen entry on ties.
                if score > best_score {
                    best_score = score;
                    best_action = Some(entry.action);
                }
            }
        }

        if let Some(action) = best_action
            && best_score >= self.threshold
        {
            debug!(
                action = action.label(),
                score = format!("{best_score:.3}"),
                "Matched action"
            );
            IntentMatch {
                action: Some(action),
                score: best_score,
            }
        } else {
            warn!(
                best_score = format!("{best_score:.3}"),
                threshold = self.threshold,
                "No matching action found"
            );
            IntentMatch {
                action: None,
                score: best_score,
            }
        }
    }

    /// Reply body for a message no action could be matched to.
    pub fn unmatched_reply(&self, sender: &str) -> String {
        format!(
            "Dear {sender},\n\n\
             Thank you for your email. Unfortunately, I was unable to identify \
             the specific request you're making.\n\n\
             Could you please provide more details or rephrase your request? \
             Alternatively, you may contact our support team directly for assistance.\n\n\
             I apologize for any inconvenience.\n\n\
             Best regards,\nDigital Employee"
        )
    }
}

/// Sørensen–Dice coefficient over character bigrams, whitespace removed.
///
/// Symmetric, range [0, 1], 1.0 for identical strings. Bigram counts are
/// multiset-intersected so repeated bigrams are not double-counted.
pub fn dice_similarity(first: &str, second: &str) -> f64 {
    let a: Vec<char> = first.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = second.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0_usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1]))
            && *count > 0
        {
            *count -= 1;
            intersection += 1;
        }
    }

    (2.0 * intersection as f64) / ((a.len() + b.len() - 2) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionCatalog, ActionMapping};

    fn matcher() -> IntentMatcher {
        IntentMatcher::new(ActionCatalog::builtin(), 0.6)
    }

    // ── dice_similarity ─────────────────────────────────────────────

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(dice_similarity("loan application", "loan application"), 1.0);
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(dice_similarity("loan application", "loanapplication"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(dice_similarity("abcd", "wxyz"), 0.0);
    }

    #[test]
    fn short_strings_score_zero() {
        assert_eq!(dice_similarity("a", "a big text"), 0.0);
        assert_eq!(dice_similarity("", "anything"), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let ab = dice_similarity("credit card", "card evaluation");
        let ba = dice_similarity("card evaluation", "credit card");
        assert_eq!(ab, ba);
    }

    #[test]
    fn repeated_bigrams_not_double_counted() {
        // "aaa" has bigrams {aa, aa}; "aab" has {aa, ab}: one shared.
        let score = dice_similarity("aaa", "aab");
        assert!((score - 0.5).abs() < 1e-9);
    }

    // ── match_intent ────────────────────────────────────────────────

    #[test]
    fn exact_pattern_substring_scores_at_least_point_eight() {
        let m = matcher();
        for entry in ActionCatalog::builtin().entries() {
            for pattern in &entry.patterns {
                let subject = format!("DIGITAL EMPLOYEE : {pattern}");
                let result = m.match_intent(&subject, "some unrelated body text here");
                assert!(
                    result.score >= 0.8,
                    "pattern {pattern:?} scored {}",
                    result.score
                );
                assert!(result.action.is_some(), "pattern {pattern:?} did not match");
            }
        }
    }

    #[test]
    fn pattern_as_entire_search_text_scores_one() {
        let m = matcher();
        let result = m.match_intent("loan application", "");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.action, Some(ActionKind::ProcessLoanApplication));
    }

    #[test]
    fn matching_is_deterministic() {
        let m = matcher();
        let a = m.match_intent("DIGITAL EMPLOYEE : credit card evaluation", "please");
        let b = m.match_intent("DIGITAL EMPLOYEE : credit card evaluation", "please");
        assert_eq!(a, b);
    }

    #[test]
    fn unrelated_text_returns_no_action() {
        let m = matcher();
        let result = m.match_intent("random subject unrelated to anything", "");
        assert_eq!(result.action, None);
        assert!(result.score < 0.6);
    }

    #[test]
    fn below_threshold_reports_best_score() {
        let strict = IntentMatcher::new(ActionCatalog::builtin(), 0.99);
        let result = strict.match_intent("DIGITAL EMPLOYEE : loan application request", "body");
        assert_eq!(result.action, None);
        assert!(result.score >= 0.8);
    }

    #[test]
    fn loan_subject_matches_loan_action() {
        let m = matcher();
        let result = m.match_intent("DIGITAL EMPLOYEE : loan application", "");
        assert_eq!(result.action, Some(ActionKind::ProcessLoanApplication));
    }

    #[test]
    fn card_evaluation_subject_matches_card_action() {
        let m = matcher();
        let result = m.match_intent(
            "DIGITAL EMPLOYEE : credit card evaluation request",
            "statement attached",
        );
        assert_eq!(result.action, Some(ActionKind::GenerateCardSummary));
    }

    #[test]
    fn ties_keep_first_catalog_entry() {
        let catalog = ActionCatalog::new(vec![
            ActionMapping {
                patterns: vec!["duplicate phrase".into()],
                action: ActionKind::GenerateAccountStatement,
                description: "first".into(),
            },
            ActionMapping {
                patterns: vec!["duplicate phrase".into()],
                action: ActionKind::HandleSupportRequest,
                description: "second".into(),
            },
        ])
        .unwrap();
        let m = IntentMatcher::new(catalog, 0.6);
        let result = m.match_intent("duplicate phrase", "");
        assert_eq!(result.action, Some(ActionKind::GenerateAccountStatement));
    }

    #[test]
    fn unmatched_reply_names_the_sender() {
        let m = matcher();
        let reply = m.unmatched_reply("alice@example.com");
        assert!(reply.starts_with("Dear alice@example.com,"));
        assert!(reply.contains("unable to identify"));
    }
}
