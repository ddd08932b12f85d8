//! Action handlers — one per supported business action.

pub mod card_summary;
pub mod report;
pub mod simple;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::ActionKind;
use crate::error::ActionError;
use crate::mailbox::types::IncomingEmail;

pub use card_summary::CardSummaryAction;
pub use simple::{AccountStatementAction, LoanApplicationAction, SupportRequestAction};

/// Result of executing an action, consumed by the dispatch coordinator to
/// build the outbound reply. Never persisted.
#[derive(Debug, Clone)]
pub struct ActionReply {
    /// Whether the action did what the sender asked.
    pub succeeded: bool,
    /// Plain-text reply body.
    pub message: String,
    /// HTML reply body, when the action produced a rich report.
    pub html: Option<String>,
    /// Explicit reply subject; absent means mirror the original subject.
    pub subject: Option<String>,
}

impl ActionReply {
    /// A plain-text reply.
    pub fn text(succeeded: bool, message: impl Into<String>) -> Self {
        Self {
            succeeded,
            message: message.into(),
            html: None,
            subject: None,
        }
    }
}

/// A collaborator capability that performs one supported business action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError>;
}

/// Registry of action handlers, keyed by [`ActionKind`].
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: ActionKind, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action, handler);
    }

    pub fn get(&self, action: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&action).cloned()
    }

    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}
