//! Action catalog — the static mapping from subject/body keyword patterns
//! to supported actions.
//!
//! A pure data table: no matching logic lives here (see `matcher`). Entries
//! are validated once at construction so a malformed catalog fails at
//! startup, not at match time.

use crate::error::ConfigError;

/// The supported business actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Analyze an attached credit card statement and reply with a report.
    GenerateCardSummary,
    /// Acknowledge a loan application with a reference number.
    ProcessLoanApplication,
    /// Acknowledge an account statement request.
    GenerateAccountStatement,
    /// Log a customer support request.
    HandleSupportRequest,
}

impl ActionKind {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GenerateCardSummary => "generate_card_summary",
            Self::ProcessLoanApplication => "process_loan_application",
            Self::GenerateAccountStatement => "generate_account_statement",
            Self::HandleSupportRequest => "handle_support_request",
        }
    }
}

/// One catalog entry: keyword patterns mapped to an action.
#[derive(Debug, Clone)]
pub struct ActionMapping {
    /// Keywords/phrases matched against subject + body (case-folded).
    pub patterns: Vec<String>,
    /// The action to execute on a match.
    pub action: ActionKind,
    /// Human-readable description of what the action does.
    pub description: String,
}

/// Ordered, read-only collection of action mappings.
///
/// Catalog order matters: the matcher breaks score ties in favor of the
/// first-seen entry.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    entries: Vec<ActionMapping>,
}

impl ActionCatalog {
    /// Build a catalog, rejecting malformed entries.
    pub fn new(entries: Vec<ActionMapping>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::InvalidCatalog("catalog has no entries".into()));
        }
        for entry in &entries {
            if entry.patterns.is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "entry {} has an empty pattern list",
                    entry.action.label()
                )));
            }
            if entry.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "entry {} contains a blank pattern",
                    entry.action.label()
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The built-in catalog of supported actions.
    pub fn builtin() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        let entries = vec![
            ActionMapping {
                patterns: strings(&[
                    "credit card evaluation",
                    "credit card request",
                    "evaluate credit card",
                    "card evaluation request",
                ]),
                action: ActionKind::GenerateCardSummary,
                description: "Generate credit card evaluation summary".into(),
            },
            ActionMapping {
                patterns: strings(&[
                    "loan application",
                    "loan request",
                    "apply for loan",
                    "loan evaluation",
                ]),
                action: ActionKind::ProcessLoanApplication,
                description: "Process loan application request".into(),
            },
            ActionMapping {
                patterns: strings(&[
                    "account statement",
                    "statement request",
                    "monthly statement",
                    "generate statement",
                ]),
                action: ActionKind::GenerateAccountStatement,
                description: "Generate account statement".into(),
            },
            ActionMapping {
                patterns: strings(&[
                    "customer support",
                    "help",
                    "support request",
                    "need assistance",
                ]),
                action: ActionKind::HandleSupportRequest,
                description: "Handle customer support request".into(),
            },
        ];
        Self::new(entries).expect("built-in catalog is well-formed")
    }

    /// Iterate entries in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &ActionMapping> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_four_actions() {
        let catalog = ActionCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        let actions: Vec<ActionKind> = catalog.entries().map(|e| e.action).collect();
        assert_eq!(actions[0], ActionKind::GenerateCardSummary);
        assert_eq!(actions[3], ActionKind::HandleSupportRequest);
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(ActionCatalog::new(vec![]).is_err());
    }

    #[test]
    fn rejects_entry_without_patterns() {
        let result = ActionCatalog::new(vec![ActionMapping {
            patterns: vec![],
            action: ActionKind::HandleSupportRequest,
            description: "broken".into(),
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_blank_pattern() {
        let result = ActionCatalog::new(vec![ActionMapping {
            patterns: vec!["help".into(), "   ".into()],
            action: ActionKind::HandleSupportRequest,
            description: "broken".into(),
        }]);
        assert!(result.is_err());
    }
}
