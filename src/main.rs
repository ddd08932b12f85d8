use std::sync::Arc;

use digital_employee::actions::{
    AccountStatementAction, ActionRegistry, CardSummaryAction, LoanApplicationAction,
    SupportRequestAction,
};
use digital_employee::analysis::OpenAiAnalyzer;
use digital_employee::catalog::{ActionCatalog, ActionKind};
use digital_employee::chart::QuickChartRenderer;
use digital_employee::config::AppConfig;
use digital_employee::dispatch::DispatchCoordinator;
use digital_employee::mailbox::{MailboxMonitor, SmtpReplySender};
use digital_employee::matcher::IntentMatcher;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  Required: EMAIL_USER, EMAIL_PASSWORD, EMAIL_HOST, EMAIL_PORT, SMTP_HOST, SMTP_PORT");
            std::process::exit(1);
        }
    };

    eprintln!("📧 Digital Employee v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   IMAP: {}:{}", config.imap_host, config.imap_port);
    eprintln!("   SMTP: {}:{}", config.smtp_host, config.smtp_port);
    eprintln!("   Account: {}", config.user);
    eprintln!("   Similarity threshold: {}", config.similarity_threshold);
    if let Some(date) = config.start_date {
        eprintln!("   Watching mail since: {date}");
    }
    eprintln!();

    let catalog = ActionCatalog::builtin();
    let matcher = IntentMatcher::new(catalog, config.similarity_threshold);

    let analyzer = Arc::new(OpenAiAnalyzer::new(config.openai_api_key.clone()));
    let charts = Arc::new(QuickChartRenderer::new(config.chart_url.clone()));

    let mut registry = ActionRegistry::new();
    registry.register(
        ActionKind::GenerateCardSummary,
        Arc::new(CardSummaryAction::new(analyzer, charts)),
    );
    registry.register(
        ActionKind::ProcessLoanApplication,
        Arc::new(LoanApplicationAction),
    );
    registry.register(
        ActionKind::GenerateAccountStatement,
        Arc::new(AccountStatementAction),
    );
    registry.register(
        ActionKind::HandleSupportRequest,
        Arc::new(SupportRequestAction),
    );
    info!(actions = registry.count(), "Action registry ready");

    let sender = Arc::new(SmtpReplySender::new(&config));
    let dispatcher = Arc::new(DispatchCoordinator::new(matcher, registry, sender));

    let monitor = Arc::new(MailboxMonitor::new(Arc::clone(&config), dispatcher));
    let mut state = monitor.state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            info!(state = state.borrow().label(), "Mailbox state changed");
        }
    });
    let handle = monitor.start();

    shutdown_signal().await;
    info!("Shutdown requested");
    monitor.stop();
    // The monitor notices the stop flag within one idle segment and logs
    // out of the IMAP session before the task completes.
    let _ = handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
