//! Statement analysis — the external text-analysis collaborator.
//!
//! The dispatch core only sees the [`StatementAnalyzer`] trait; the
//! production implementation calls the OpenAI chat-completions API in JSON
//! mode with a fixed financial-analyst prompt.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AnalysisError;

/// Default chat-completions endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Model used for statement analysis.
const MODEL: &str = "gpt-4-turbo-preview";

// ── Analysis result types ───────────────────────────────────────────
// Field names follow the JSON contract the analysis prompt pins down.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingCategory {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
    pub transaction_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequentTransaction {
    pub merchant: String,
    pub count: u32,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecommendation {
    pub card_name: String,
    pub bank: String,
    pub benefits: String,
    pub annual_fee: String,
    pub cashback_rate: String,
}

/// Structured result of analyzing one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementAnalysis {
    #[serde(default)]
    pub spending_categories: Vec<SpendingCategory>,
    #[serde(default)]
    pub top_categories: Vec<String>,
    #[serde(default)]
    pub most_frequent_transactions: Vec<FrequentTransaction>,
    #[serde(default)]
    pub total_spend: f64,
    #[serde(default)]
    pub average_transaction_amount: f64,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub recommendations: Vec<CardRecommendation>,
}

/// The external analysis collaborator.
#[async_trait]
pub trait StatementAnalyzer: Send + Sync {
    async fn analyze(&self, statement_text: &str) -> Result<StatementAnalysis, AnalysisError>;
}

// ── OpenAI implementation ───────────────────────────────────────────

/// Chat-completions client for statement analysis.
pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key,
        }
    }

    /// Override the endpoint (tests point this at a local mock).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl StatementAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, statement_text: &str) -> Result<StatementAnalysis, AnalysisError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AnalysisError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: "OPENAI_API_KEY is not configured".into(),
            }
        })?;

        let body = serde_json::json!({
            "model": MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a financial analyst expert in credit card analysis \
                                and UAE banking products. Always respond with valid JSON only."
                },
                {
                    "role": "user",
                    "content": analysis_prompt(statement_text),
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7,
            "max_tokens": 2000,
        });

        info!("Sending statement data for analysis");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AnalysisError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: format!("invalid response body: {e}"),
            }
        })?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(AnalysisError::EmptyCompletion)?;

        let analysis = serde_json::from_str(content)?;
        info!("Statement analysis received");
        Ok(analysis)
    }
}

/// The analysis prompt: pins both the task and the exact JSON shape.
fn analysis_prompt(statement_text: &str) -> String {
    format!(
        r#"You are a financial analyst specializing in credit card spending analysis for the UAE market.

Analyze the following credit card statement data and provide a comprehensive JSON response with the following structure:

{{
  "spendingCategories": [
    {{"category": "Category Name", "amount": 0, "percentage": 0, "transactionCount": 0}}
  ],
  "topCategories": ["Top 3 categories by spend"],
  "mostFrequentTransactions": [
    {{"merchant": "Merchant Name", "count": 0, "totalAmount": 0}}
  ],
  "totalSpend": 0,
  "averageTransactionAmount": 0,
  "analysis": "Detailed spending pattern analysis",
  "recommendations": [
    {{
      "cardName": "Credit Card Name",
      "bank": "Bank Name",
      "benefits": "Key benefits matching spending pattern",
      "annualFee": "Fee amount",
      "cashbackRate": "Cashback percentage"
    }}
  ]
}}

Credit Card Statement Data:
{statement_text}

Based on the spending patterns, recommend the best credit cards available in the UAE market (Emirates NBD, ADCB, FAB, Mashreq, Dubai Islamic Bank, RAKBANK, etc.) that match the user's spending behavior."#
    )
}
