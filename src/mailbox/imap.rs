//! Blocking IMAP session over TCP or rustls.
//!
//! A thin tagged-command client covering exactly what the monitor needs:
//! LOGIN, SELECT, SEARCH UNSEEN [SINCE], FETCH BODY.PEEK[], STORE \Seen,
//! IDLE and LOGOUT. All methods block — callers run them inside
//! `spawn_blocking`.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::MailboxError;

/// Read timeout for ordinary command responses.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an IDLE wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleWake {
    /// The server announced new mail (EXISTS/RECENT).
    NewMail,
    /// The wait elapsed without news.
    Timeout,
}

enum Transport {
    Tls(rustls::StreamOwned<rustls::ClientConnection, TcpStream>),
    Plain(TcpStream),
}

impl Transport {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Transport::Tls(stream) => stream.sock.set_read_timeout(timeout),
            Transport::Plain(stream) => stream.set_read_timeout(timeout),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Transport::Tls(stream) => stream.read(buf),
            Transport::Plain(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Transport::Tls(stream) => stream.write(buf),
            Transport::Plain(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Transport::Tls(stream) => stream.flush(),
            Transport::Plain(stream) => stream.flush(),
        }
    }
}

/// A logged-in IMAP session with INBOX selected.
pub struct ImapSession {
    transport: Transport,
    tag_counter: u32,
}

impl ImapSession {
    /// Connect, authenticate and select INBOX.
    pub fn connect(
        host: &str,
        port: u16,
        tls: bool,
        user: &str,
        password: &SecretString,
    ) -> Result<Self, MailboxError> {
        let tcp = TcpStream::connect((host, port))
            .map_err(|e| MailboxError::ConnectFailed(format!("{host}:{port}: {e}")))?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let transport = if tls {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let tls_config = Arc::new(
                rustls::ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth(),
            );
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| MailboxError::Tls(e.to_string()))?;
            let conn = rustls::ClientConnection::new(tls_config, server_name)
                .map_err(|e| MailboxError::Tls(e.to_string()))?;
            Transport::Tls(rustls::StreamOwned::new(conn, tcp))
        } else {
            Transport::Plain(tcp)
        };

        let mut session = Self {
            transport,
            tag_counter: 0,
        };

        let greeting = session.read_line()?;
        debug!(greeting = greeting.trim(), "IMAP greeting");

        let login = session.command(&format!(
            "LOGIN \"{}\" \"{}\"",
            user,
            password.expose_secret()
        ))?;
        if !is_ok(&login) {
            return Err(MailboxError::LoginRejected { user: user.into() });
        }

        let select = session.command("SELECT \"INBOX\"")?;
        if !is_ok(&select) {
            return Err(MailboxError::CommandFailed {
                command: "SELECT INBOX".into(),
                reason: last_line(&select),
            });
        }

        Ok(session)
    }

    /// Search for unseen messages, optionally bounded to a start date.
    /// Returns sequence numbers in server order.
    pub fn search_unseen(&mut self, since: Option<NaiveDate>) -> Result<Vec<u32>, MailboxError> {
        let query = match since {
            Some(date) => format!("SEARCH UNSEEN SINCE {}", format_since_date(date)),
            None => "SEARCH UNSEEN".into(),
        };
        let lines = self.command(&query)?;
        if !is_ok(&lines) {
            return Err(MailboxError::CommandFailed {
                command: query,
                reason: last_line(&lines),
            });
        }
        Ok(parse_search_response(&lines))
    }

    /// Fetch the full raw message. BODY.PEEK leaves the \Seen flag untouched
    /// so the read-state transition stays under the monitor's control.
    pub fn fetch(&mut self, sequence: u32) -> Result<Vec<u8>, MailboxError> {
        let lines = self.command(&format!("FETCH {sequence} (BODY.PEEK[])"))?;
        if !is_ok(&lines) {
            return Err(MailboxError::CommandFailed {
                command: format!("FETCH {sequence}"),
                reason: last_line(&lines),
            });
        }
        // Payload sits between the untagged FETCH line and the closing
        // ")" + tagged completion lines.
        let raw: String = lines
            .iter()
            .skip(1)
            .take(lines.len().saturating_sub(3))
            .cloned()
            .collect();
        Ok(raw.into_bytes())
    }

    /// Mark a message read.
    pub fn store_seen(&mut self, sequence: u32) -> Result<(), MailboxError> {
        let lines = self.command(&format!("STORE {sequence} +FLAGS (\\Seen)"))?;
        if !is_ok(&lines) {
            return Err(MailboxError::CommandFailed {
                command: format!("STORE {sequence}"),
                reason: last_line(&lines),
            });
        }
        Ok(())
    }

    /// Enter IDLE and wait for a new-mail announcement or the timeout.
    pub fn idle_wait(&mut self, timeout: Duration) -> Result<IdleWake, MailboxError> {
        let tag = self.next_tag();
        self.send_raw(&format!("{tag} IDLE\r\n"))?;

        let continuation = self.read_line()?;
        if !continuation.starts_with('+') {
            return Err(MailboxError::CommandFailed {
                command: "IDLE".into(),
                reason: continuation.trim().into(),
            });
        }

        self.transport.set_read_timeout(Some(timeout))?;
        let mut server_ended = false;
        let wake = loop {
            match self.read_line() {
                Ok(line) => {
                    if line.starts_with(&tag) {
                        // Server terminated the IDLE on its own.
                        server_ended = true;
                        break IdleWake::Timeout;
                    }
                    if line.contains("EXISTS") || line.contains("RECENT") {
                        break IdleWake::NewMail;
                    }
                }
                Err(MailboxError::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    break IdleWake::Timeout;
                }
                Err(e) => {
                    let _ = self.transport.set_read_timeout(Some(READ_TIMEOUT));
                    return Err(e);
                }
            }
        };
        self.transport.set_read_timeout(Some(READ_TIMEOUT))?;

        if !server_ended {
            self.send_raw("DONE\r\n")?;
            loop {
                let line = self.read_line()?;
                if line.starts_with(&tag) {
                    break;
                }
            }
        }

        Ok(wake)
    }

    /// Gracefully end the session. Errors are ignored — the server may have
    /// already dropped the connection.
    pub fn logout(&mut self) {
        let tag = self.next_tag();
        let _ = self.send_raw(&format!("{tag} LOGOUT\r\n"));
    }

    // ── Wire helpers ────────────────────────────────────────────────

    fn next_tag(&mut self) -> String {
        self.tag_counter += 1;
        format!("A{}", self.tag_counter)
    }

    /// Send a tagged command and collect response lines up to and including
    /// the tagged completion line.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, MailboxError> {
        let tag = self.next_tag();
        self.send_raw(&format!("{tag} {cmd}\r\n"))?;
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    fn send_raw(&mut self, data: &str) -> Result<(), MailboxError> {
        self.transport.write_all(data.as_bytes())?;
        self.transport.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, MailboxError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.transport.read(&mut byte) {
                Ok(0) => return Err(MailboxError::ConnectionClosed),
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Did the tagged completion line report OK?
fn is_ok(lines: &[String]) -> bool {
    lines.last().is_some_and(|l| l.contains("OK"))
}

fn last_line(lines: &[String]) -> String {
    lines.last().map(|l| l.trim().to_string()).unwrap_or_default()
}

/// Extract sequence numbers from `* SEARCH n n n` response lines.
pub fn parse_search_response(lines: &[String]) -> Vec<u32> {
    let mut sequences = Vec::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix("* SEARCH") {
            sequences.extend(rest.split_whitespace().filter_map(|s| s.parse::<u32>().ok()));
        }
    }
    sequences
}

/// Format a date the way IMAP SINCE expects: `DD-Mon-YYYY`.
pub fn format_since_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_date_uses_imap_format() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(format_since_date(date), "02-Jun-2025");
    }

    #[test]
    fn parses_search_response_sequences() {
        let lines = vec![
            "* SEARCH 3 7 12\r\n".to_string(),
            "A3 OK SEARCH completed\r\n".to_string(),
        ];
        assert_eq!(parse_search_response(&lines), vec![3, 7, 12]);
    }

    #[test]
    fn empty_search_response_yields_no_sequences() {
        let lines = vec![
            "* SEARCH\r\n".to_string(),
            "A3 OK SEARCH completed\r\n".to_string(),
        ];
        assert!(parse_search_response(&lines).is_empty());
    }

    #[test]
    fn search_response_spread_over_multiple_lines() {
        let lines = vec![
            "* SEARCH 1 2\r\n".to_string(),
            "* SEARCH 9\r\n".to_string(),
            "A4 OK\r\n".to_string(),
        ];
        assert_eq!(parse_search_response(&lines), vec![1, 2, 9]);
    }

    #[test]
    fn ok_detection_reads_tagged_line() {
        let ok = vec!["* SEARCH\r\n".into(), "A1 OK done\r\n".into()];
        let bad = vec!["A1 BAD syntax\r\n".into()];
        assert!(is_ok(&ok));
        assert!(!is_ok(&bad));
    }
}
