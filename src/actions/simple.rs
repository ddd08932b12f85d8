//! Acknowledgement-style actions: loan applications, account statements and
//! support requests. Each replies with a generated reference and a fixed
//! processing-time message.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::actions::{ActionHandler, ActionReply};
use crate::error::ActionError;
use crate::mailbox::types::IncomingEmail;

fn reference(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_millis())
}

/// Acknowledge a loan application.
pub struct LoanApplicationAction;

#[async_trait]
impl ActionHandler for LoanApplicationAction {
    async fn execute(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError> {
        info!(sender = %email.sender, "Processing loan application");
        let message = format!(
            "Dear {},\n\nThank you for your loan application.\n\n\
             Your application has been received and is being processed. \
             We will evaluate your request and get back to you within 5 business days.\n\n\
             Application Reference: {}\n\n\
             Best regards,\nDigital Employee",
            email.sender,
            reference("LOAN"),
        );
        Ok(ActionReply::text(true, message))
    }
}

/// Acknowledge an account statement request.
pub struct AccountStatementAction;

#[async_trait]
impl ActionHandler for AccountStatementAction {
    async fn execute(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError> {
        info!(sender = %email.sender, "Generating account statement");
        let message = format!(
            "Dear {},\n\nYour account statement request has been received.\n\n\
             We are generating your monthly statement and will send it to you shortly. \
             Please allow 1-2 hours for processing.\n\n\
             Request ID: {}\n\n\
             Best regards,\nDigital Employee",
            email.sender,
            reference("STMT"),
        );
        Ok(ActionReply::text(true, message))
    }
}

/// Log a customer support request.
pub struct SupportRequestAction;

#[async_trait]
impl ActionHandler for SupportRequestAction {
    async fn execute(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError> {
        info!(sender = %email.sender, "Handling support request");
        let message = format!(
            "Dear {},\n\nThank you for contacting our support team.\n\n\
             Your support request has been logged and assigned to a specialist. \
             We aim to respond to all inquiries within 24 hours.\n\n\
             Ticket Number: {}\n\n\
             Best regards,\nDigital Employee Support",
            email.sender,
            reference("SUP"),
        );
        Ok(ActionReply::text(true, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email_from(sender: &str) -> IncomingEmail {
        IncomingEmail {
            sender: sender.into(),
            subject: "DIGITAL EMPLOYEE : loan application".into(),
            text: String::new(),
            html: String::new(),
            received_at: Utc::now(),
            attachments: vec![],
            identity: "id-1".into(),
        }
    }

    #[tokio::test]
    async fn loan_reply_has_loan_reference() {
        let reply = LoanApplicationAction
            .execute(&email_from("alice@example.com"))
            .await
            .unwrap();
        assert!(reply.succeeded);
        assert!(reply.message.starts_with("Dear alice@example.com,"));
        assert!(reply.message.contains("Application Reference: LOAN-"));
        assert!(reply.message.contains("5 business days"));
        assert!(reply.html.is_none());
    }

    #[tokio::test]
    async fn statement_reply_has_stmt_reference() {
        let reply = AccountStatementAction
            .execute(&email_from("bob@example.com"))
            .await
            .unwrap();
        assert!(reply.succeeded);
        assert!(reply.message.contains("Request ID: STMT-"));
        assert!(reply.message.contains("1-2 hours"));
    }

    #[tokio::test]
    async fn support_reply_has_sup_reference() {
        let reply = SupportRequestAction
            .execute(&email_from("carol@example.com"))
            .await
            .unwrap();
        assert!(reply.succeeded);
        assert!(reply.message.contains("Ticket Number: SUP-"));
        assert!(reply.message.contains("24 hours"));
    }
}
