//! Credit card statement analysis action.
//!
//! Parse the first attached statement, run it through the analysis
//! collaborator, render the spending pie chart, and reply with the HTML
//! report. Failures are converted into a plain-text apology so the sender
//! always gets a useful reply.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use tracing::{error, info};

use crate::actions::{ActionHandler, ActionReply};
use crate::actions::report::statement_report;
use crate::analysis::StatementAnalyzer;
use crate::chart::ChartRenderer;
use crate::error::ActionError;
use crate::mailbox::types::IncomingEmail;
use crate::statement;

/// Subject used for the HTML analysis report.
const REPORT_SUBJECT: &str = "Your Credit Card Statement Analysis Report";

pub struct CardSummaryAction {
    analyzer: Arc<dyn StatementAnalyzer>,
    charts: Arc<dyn ChartRenderer>,
}

impl CardSummaryAction {
    pub fn new(analyzer: Arc<dyn StatementAnalyzer>, charts: Arc<dyn ChartRenderer>) -> Self {
        Self { analyzer, charts }
    }

    async fn build_report(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError> {
        // Only the first attachment is treated as the statement file.
        let attachment = &email.attachments[0];
        let statement_text = statement::extract_text(attachment)?;

        info!("Statement parsed, requesting analysis");
        let analysis = self.analyzer.analyze(&statement_text).await?;

        info!("Analysis complete, rendering chart");
        let chart_png = self.charts.render_pie(&analysis.spending_categories).await?;
        let chart_base64 = base64::engine::general_purpose::STANDARD.encode(chart_png);

        Ok(ActionReply {
            succeeded: true,
            message: "Please view this email in HTML format.".into(),
            html: Some(statement_report(&email.sender, &analysis, &chart_base64)),
            subject: Some(REPORT_SUBJECT.into()),
        })
    }
}

#[async_trait]
impl ActionHandler for CardSummaryAction {
    async fn execute(&self, email: &IncomingEmail) -> Result<ActionReply, ActionError> {
        info!(sender = %email.sender, "Generating card summary");

        if email.attachments.is_empty() {
            return Ok(ActionReply::text(
                false,
                format!(
                    "Dear {},\n\n\
                     Thank you for your credit card statement analysis request.\n\n\
                     However, no statement file was attached to your email. \
                     Please resend your email with your credit card statement attached \
                     (supported formats: CSV, PDF, TXT).\n\n\
                     Best regards,\nDigital Employee",
                    email.sender
                ),
            ));
        }

        info!(count = email.attachments.len(), "Processing attachment(s)");
        match self.build_report(email).await {
            Ok(reply) => {
                info!(sender = %email.sender, "Card summary generated");
                Ok(reply)
            }
            Err(e) => {
                error!(sender = %email.sender, error = %e, "Card summary failed");
                Ok(ActionReply::text(
                    false,
                    format!(
                        "Dear {},\n\n\
                         We encountered an error while analyzing your credit card statement: {e}\n\n\
                         Please ensure your file is in a supported format (CSV, PDF, or TXT) and try again.\n\n\
                         Best regards,\nDigital Employee",
                        email.sender
                    ),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::analysis::{SpendingCategory, StatementAnalysis};
    use crate::error::{AnalysisError, ChartError};
    use crate::mailbox::types::Attachment;

    struct FixedAnalyzer {
        fail: bool,
    }

    #[async_trait]
    impl StatementAnalyzer for FixedAnalyzer {
        async fn analyze(&self, _text: &str) -> Result<StatementAnalysis, AnalysisError> {
            if self.fail {
                return Err(AnalysisError::EmptyCompletion);
            }
            Ok(StatementAnalysis {
                spending_categories: vec![SpendingCategory {
                    category: "Groceries".into(),
                    amount: 500.0,
                    percentage: 100.0,
                    transaction_count: 5,
                }],
                top_categories: vec!["Groceries".into()],
                most_frequent_transactions: vec![],
                total_spend: 500.0,
                average_transaction_amount: 100.0,
                analysis: "All groceries.".into(),
                recommendations: vec![],
            })
        }
    }

    struct FixedRenderer;

    #[async_trait]
    impl ChartRenderer for FixedRenderer {
        async fn render_pie(
            &self,
            _categories: &[SpendingCategory],
        ) -> Result<Vec<u8>, ChartError> {
            Ok(b"png-bytes".to_vec())
        }
    }

    fn action(fail_analysis: bool) -> CardSummaryAction {
        CardSummaryAction::new(
            Arc::new(FixedAnalyzer {
                fail: fail_analysis,
            }),
            Arc::new(FixedRenderer),
        )
    }

    fn email(attachments: Vec<Attachment>) -> IncomingEmail {
        IncomingEmail {
            sender: "alice@example.com".into(),
            subject: "DIGITAL EMPLOYEE : credit card evaluation request".into(),
            text: "please analyze my statement".into(),
            html: String::new(),
            received_at: Utc::now(),
            attachments,
            identity: "id-1".into(),
        }
    }

    fn csv_attachment() -> Attachment {
        Attachment {
            filename: "statement.csv".into(),
            mime_type: "text/csv".into(),
            content: b"Date,Amount\n2025-06-01,500\n".to_vec(),
        }
    }

    #[tokio::test]
    async fn no_attachment_yields_plain_apology() {
        let reply = action(false).execute(&email(vec![])).await.unwrap();
        assert!(!reply.succeeded);
        assert!(reply.message.starts_with("Dear alice@example.com,"));
        assert!(reply.message.contains("no statement file was attached"));
        assert!(reply.html.is_none());
        assert!(reply.subject.is_none());
    }

    #[tokio::test]
    async fn with_attachment_yields_html_report() {
        let reply = action(false)
            .execute(&email(vec![csv_attachment()]))
            .await
            .unwrap();
        assert!(reply.succeeded);
        assert_eq!(reply.subject.as_deref(), Some(REPORT_SUBJECT));
        let html = reply.html.unwrap();
        assert!(html.contains("Groceries"));
        // "png-bytes" base64-encoded
        assert!(html.contains("cG5nLWJ5dGVz"));
        assert_eq!(reply.message, "Please view this email in HTML format.");
    }

    #[tokio::test]
    async fn analysis_failure_becomes_apology_not_error() {
        let reply = action(true)
            .execute(&email(vec![csv_attachment()]))
            .await
            .unwrap();
        assert!(!reply.succeeded);
        assert!(reply.message.contains("error while analyzing"));
        assert!(reply.html.is_none());
    }
}
