//! Mailbox monitor.
//!
//! Owns the IMAP connection lifecycle: connect, sweep unseen mail, sit in
//! IDLE until the server announces new messages, reconnect on failure.
//! Each accepted email is handed to the dispatch coordinator and marked
//! seen only after its reply was delivered, so an interrupted run retries
//! the message on the next sweep.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::dispatch::DispatchCoordinator;
use crate::error::MailboxError;
use crate::mailbox::imap::{IdleWake, ImapSession};
use crate::mailbox::types::parse_incoming;

/// Subject prefix that gates which emails are treated as task requests.
pub const SUBJECT_PREFIX: &str = "DIGITAL EMPLOYEE :";

/// Fixed delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// How long a single IDLE segment lasts before being re-issued. Kept short:
/// the session mutex is held for the whole segment, so this bounds how long
/// queued mark-seen work and shutdown wait. Re-issuing also keeps the
/// connection well inside the 30-minute server IDLE limit.
const IDLE_SEGMENT: Duration = Duration::from_secs(30);

/// Maximum number of message identities remembered for deduplication.
const PROCESSED_CAPACITY: usize = 4096;

// ── Connection state ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connecting,
    Connected,
}

impl MonitorState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

// ── Deduplication ───────────────────────────────────────────────────

/// Bounded FIFO set of message identities already handed to dispatch.
/// When full, the oldest identity is evicted.
pub struct ProcessedSet {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ProcessedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an identity. Returns false when it was already present.
    pub fn insert(&mut self, identity: String) -> bool {
        if self.seen.contains(&identity) {
            return false;
        }
        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        self.seen.insert(identity.clone());
        self.order.push_back(identity);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// True when the subject carries the exact task prefix.
pub fn has_task_prefix(subject: &str) -> bool {
    subject.starts_with(SUBJECT_PREFIX)
}

// ── Monitor ─────────────────────────────────────────────────────────

pub struct MailboxMonitor {
    config: Arc<AppConfig>,
    dispatcher: Arc<DispatchCoordinator>,
    state_tx: watch::Sender<MonitorState>,
    running: Arc<AtomicBool>,
}

impl MailboxMonitor {
    pub fn new(config: Arc<AppConfig>, dispatcher: Arc<DispatchCoordinator>) -> Self {
        let (state_tx, _) = watch::channel(MonitorState::Disconnected);
        Self {
            config,
            dispatcher,
            state_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<MonitorState> {
        self.state_tx.subscribe()
    }

    /// Spawn the monitor loop. Runs until `stop` is called.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run().await })
    }

    /// Request shutdown. Takes effect within one IDLE segment; the session
    /// then logs out before the monitor task finishes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn run(&self) {
        let mut processed = ProcessedSet::new(PROCESSED_CAPACITY);

        while self.running.load(Ordering::SeqCst) {
            self.state_tx.send_replace(MonitorState::Connecting);
            info!(host = %self.config.imap_host, "Connecting to IMAP server");

            let session = match self.connect().await {
                Ok(session) => session,
                Err(e) => {
                    error!(error = %e, "IMAP connection failed");
                    self.state_tx.send_replace(MonitorState::Disconnected);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };

            self.state_tx.send_replace(MonitorState::Connected);
            info!("Connected, watching INBOX");
            let session = Arc::new(Mutex::new(session));

            // Sequence numbers are only valid within this session, so the
            // mark-seen queue lives and dies with it.
            let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

            if let Err(e) = self.serve(&session, &mut processed, &seen_tx, &mut seen_rx).await {
                error!(error = %e, "Mailbox session ended");
            }

            // Land any mark-seen work that raced the shutdown, then log out.
            // Best-effort: the server may already be gone.
            flush_seen(&session, &mut seen_rx).await;
            let _ = run_blocking(&session, "LOGOUT", |s| {
                s.logout();
                Ok(())
            })
            .await;

            self.state_tx.send_replace(MonitorState::Disconnected);
            if self.running.load(Ordering::SeqCst) {
                info!(delay_secs = RECONNECT_DELAY.as_secs(), "Reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }

        self.state_tx.send_replace(MonitorState::Disconnected);
        info!("Mailbox monitor stopped");
    }

    async fn connect(&self) -> Result<ImapSession, MailboxError> {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            ImapSession::connect(
                &config.imap_host,
                config.imap_port,
                config.imap_tls,
                &config.user,
                &config.password,
            )
        })
        .await
        .map_err(|e| MailboxError::ConnectFailed(e.to_string()))?
    }

    /// Sweep-then-idle loop on one live session. Returns when the session
    /// errors or shutdown is requested. Queued mark-seen work is drained
    /// between IDLE segments, while the session mutex is free.
    async fn serve(
        &self,
        session: &Arc<Mutex<ImapSession>>,
        processed: &mut ProcessedSet,
        seen_tx: &mpsc::UnboundedSender<u32>,
        seen_rx: &mut mpsc::UnboundedReceiver<u32>,
    ) -> Result<(), MailboxError> {
        loop {
            flush_seen(session, seen_rx).await;
            if !self.running.load(Ordering::SeqCst) {
                return Ok(());
            }

            self.sweep(session, processed, seen_tx).await?;

            match run_blocking(session, "IDLE", |s| s.idle_wait(IDLE_SEGMENT)).await? {
                IdleWake::NewMail => debug!("IDLE woke with new mail"),
                IdleWake::Timeout => {}
            }
        }
    }

    /// Process every unseen message currently in the mailbox.
    async fn sweep(
        &self,
        session: &Arc<Mutex<ImapSession>>,
        processed: &mut ProcessedSet,
        seen_tx: &mpsc::UnboundedSender<u32>,
    ) -> Result<(), MailboxError> {
        let since = self.config.start_date;
        let sequences = run_blocking(session, "SEARCH", move |s| s.search_unseen(since)).await?;
        if sequences.is_empty() {
            return Ok(());
        }
        info!(count = sequences.len(), "Unseen messages found");

        for sequence in sequences {
            let raw = match run_blocking(session, "FETCH", move |s| s.fetch(sequence)).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(sequence, error = %e, "Fetch failed, skipping message");
                    continue;
                }
            };

            let Some(email) = parse_incoming(&raw, sequence) else {
                warn!(sequence, "Unparseable message, skipping");
                continue;
            };

            if !processed.insert(email.identity.clone()) {
                debug!(identity = %email.identity, "Already processed, skipping");
                continue;
            }

            if !has_task_prefix(&email.subject) {
                info!(subject = %email.subject, "Missing task prefix, marking seen");
                mark_seen(session, sequence).await;
                continue;
            }

            // Distinct messages dispatch concurrently. The identity is
            // already recorded, so a later sweep cannot re-dispatch one
            // whose reply is still in flight. The STORE itself is queued
            // back to the serve loop, which owns the session turn-taking.
            let dispatcher = Arc::clone(&self.dispatcher);
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                if dispatcher.handle(&email).await {
                    let _ = seen_tx.send(sequence);
                } else {
                    warn!(sequence, "Reply not delivered, leaving message unseen");
                }
            });
        }

        Ok(())
    }
}

async fn mark_seen(session: &Arc<Mutex<ImapSession>>, sequence: u32) {
    if let Err(e) = run_blocking(session, "STORE", move |s| s.store_seen(sequence)).await {
        warn!(sequence, error = %e, "Failed to mark message seen");
    }
}

/// Pull everything currently queued without waiting for more.
fn drain_pending(seen_rx: &mut mpsc::UnboundedReceiver<u32>) -> Vec<u32> {
    let mut sequences = Vec::new();
    while let Ok(sequence) = seen_rx.try_recv() {
        sequences.push(sequence);
    }
    sequences
}

/// Mark every queued sequence seen. Replied-to messages wait at most one
/// IDLE segment before their read-state transition lands.
async fn flush_seen(session: &Arc<Mutex<ImapSession>>, seen_rx: &mut mpsc::UnboundedReceiver<u32>) {
    for sequence in drain_pending(seen_rx) {
        mark_seen(session, sequence).await;
    }
}

/// Run one blocking IMAP operation on the shared session without tying up
/// the async runtime.
async fn run_blocking<T, F>(
    session: &Arc<Mutex<ImapSession>>,
    op: &'static str,
    f: F,
) -> Result<T, MailboxError>
where
    T: Send + 'static,
    F: FnOnce(&mut ImapSession) -> Result<T, MailboxError> + Send + 'static,
{
    let session = Arc::clone(session);
    tokio::task::spawn_blocking(move || {
        let mut guard = session.lock().map_err(|_| MailboxError::ConnectionClosed)?;
        f(&mut guard)
    })
    .await
    .map_err(|e| MailboxError::CommandFailed {
        command: op.into(),
        reason: e.to_string(),
    })?
}
