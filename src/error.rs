//! Error types for the Digital Employee.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Statement parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Configuration-related errors. Fatal at startup — the process exits.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid action catalog: {0}")]
    InvalidCatalog(String),
}

/// Mailbox (IMAP) errors. Recoverable — they drive the reconnect loop.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Login rejected for {user}")]
    LoginRejected { user: String },

    #[error("Server command failed: {command}: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound delivery (SMTP) errors. Recovered per message — logged, the
/// source message stays unseen.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("SMTP relay error: {0}")]
    Relay(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}

/// Action handler errors. Recovered — converted into an apology reply.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Statement parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Chart rendering failed: {0}")]
    Chart(#[from] ChartError),

    #[error("Action failed: {0}")]
    Other(String),
}

/// Statement analysis (external API) errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Analysis API returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Empty completion in analysis response")]
    EmptyCompletion,

    #[error("Invalid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Chart rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("No categories to chart")]
    EmptySeries,

    #[error("Render request failed: {0}")]
    RequestFailed(String),

    #[error("Renderer returned status {status}")]
    BadStatus { status: u16 },
}

/// Statement file decoding errors. Recovered per message.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("CSV parse error: {0}")]
    Csv(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("Attachment is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
