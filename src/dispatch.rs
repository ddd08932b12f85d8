//! Dispatch coordinator.
//!
//! Takes one parsed email through the full pipeline: intent match, action
//! execution, reply composition, delivery. Every email gets exactly one
//! reply, whether or not it matched an action. Returns whether the reply
//! was actually delivered so the caller can decide about marking the
//! message seen.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::actions::ActionRegistry;
use crate::mailbox::smtp::{reply_subject, OutgoingReply, ReplySender};
use crate::mailbox::types::IncomingEmail;
use crate::matcher::IntentMatcher;

pub struct DispatchCoordinator {
    matcher: IntentMatcher,
    registry: ActionRegistry,
    sender: Arc<dyn ReplySender>,
}

impl DispatchCoordinator {
    pub fn new(
        matcher: IntentMatcher,
        registry: ActionRegistry,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            matcher,
            registry,
            sender,
        }
    }

    /// Run one email through match, execute, and reply. Returns true when
    /// the reply was handed to the relay successfully.
    pub async fn handle(&self, email: &IncomingEmail) -> bool {
        info!(sender = %email.sender, subject = %email.subject, "Dispatching email");

        let outcome = self.matcher.match_intent(&email.subject, &email.text);
        let reply = match outcome.action {
            Some(action) => {
                info!(action = action.label(), score = outcome.score, "Intent matched");
                match self.registry.get(action) {
                    Some(handler) => match handler.execute(email).await {
                        Ok(reply) => {
                            if !reply.succeeded {
                                warn!(action = action.label(), "Action reported failure");
                            }
                            reply
                        }
                        Err(e) => {
                            error!(action = action.label(), error = %e, "Action failed");
                            crate::actions::ActionReply::text(
                                false,
                                format!(
                                    "Dear {},\n\n\
                                     We encountered an error while processing your request. \
                                     Please try again later.\n\n\
                                     Best regards,\nDigital Employee",
                                    email.sender
                                ),
                            )
                        }
                    },
                    None => {
                        warn!(action = action.label(), "No handler registered");
                        crate::actions::ActionReply::text(
                            false,
                            self.matcher.unmatched_reply(&email.sender),
                        )
                    }
                }
            }
            None => {
                info!(score = outcome.score, "No intent matched");
                crate::actions::ActionReply::text(false, self.matcher.unmatched_reply(&email.sender))
            }
        };

        let subject = reply
            .subject
            .clone()
            .unwrap_or_else(|| reply_subject(&email.subject));
        let outgoing = OutgoingReply {
            to: email.sender.clone(),
            subject,
            text: reply.message,
            html: reply.html,
        };

        match self.sender.send(outgoing).await {
            Ok(()) => {
                info!(to = %email.sender, "Reply delivered");
                true
            }
            Err(e) => {
                error!(to = %email.sender, error = %e, "Reply delivery failed");
                false
            }
        }
    }
}
