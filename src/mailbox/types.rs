//! Mailbox-facing types — incoming email, attachments, identity derivation.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};

/// An attachment pulled from a fetched message.
///
/// Owned by the [`IncomingEmail`] that produced it; dropped after dispatch.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// A fetched, parsed inbound email.
///
/// Materialized once per fetch and discarded after dispatch completes —
/// nothing here is persisted.
#[derive(Debug, Clone)]
pub struct IncomingEmail {
    /// Sender address.
    pub sender: String,
    /// Subject line, empty when absent.
    pub subject: String,
    /// Plain-text body (HTML-stripped fallback when only HTML exists).
    pub text: String,
    /// HTML body, empty when absent.
    pub html: String,
    /// When the message was sent/received.
    pub received_at: DateTime<Utc>,
    /// Attachments in message order.
    pub attachments: Vec<Attachment>,
    /// Deduplication key — stable across repeated fetches of this message.
    pub identity: String,
}

/// Derive the dedup identity from the message-id (or sequence number when
/// the header is absent) combined with the Date header. Both components
/// come from the message itself, never from the local clock, so the same
/// message fetched twice always yields the same identity.
pub fn derive_identity(
    message_id: Option<&str>,
    sequence: u32,
    sent_at: Option<DateTime<Utc>>,
) -> String {
    let date_part = match sent_at {
        Some(date) => date.to_rfc3339(),
        None => "undated".to_string(),
    };
    match message_id {
        Some(id) if !id.is_empty() => format!("{id}-{date_part}"),
        _ => format!("{sequence}-{date_part}"),
    }
}

/// Parse a raw RFC 822 message into an [`IncomingEmail`].
///
/// Returns `None` when the bytes are not parseable as a message at all.
pub fn parse_incoming(raw: &[u8], sequence: u32) -> Option<IncomingEmail> {
    let parsed = MessageParser::default().parse(raw)?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into());

    let subject = parsed.subject().unwrap_or("").to_string();

    // body_html/body_text synthesize conversions when asked for a body the
    // message does not actually carry, so gate on the real body counts.
    let html = if parsed.html_body_count() > 0 {
        parsed
            .body_html(0)
            .map(|h| h.to_string())
            .unwrap_or_default()
    } else {
        String::new()
    };
    let text = if parsed.text_body_count() > 0 {
        parsed
            .body_text(0)
            .map(|t| t.to_string())
            .unwrap_or_default()
    } else if !html.is_empty() {
        strip_html(&html)
    } else {
        String::new()
    };

    let sent_at = parsed
        .date()
        .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
        .map(|d| d.with_timezone(&Utc));
    let received_at = sent_at.unwrap_or_else(Utc::now);

    let attachments = parsed
        .attachments()
        .map(|part| Attachment {
            filename: part.attachment_name().unwrap_or("attachment").to_string(),
            mime_type: part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".into()),
            content: part.contents().to_vec(),
        })
        .collect();

    let identity = derive_identity(parsed.message_id(), sequence, sent_at);

    Some(IncomingEmail {
        sender,
        subject,
        text,
        html,
        received_at,
        attachments,
        identity,
    })
}

/// Strip HTML tags from content (basic) and normalize whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_EMAIL: &str = "From: Alice <alice@example.com>\r\n\
        To: clerk@bank.example\r\n\
        Subject: DIGITAL EMPLOYEE : loan application\r\n\
        Message-ID: <msg-1@example.com>\r\n\
        Date: Mon, 2 Jun 2025 10:00:00 +0000\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        I would like to apply for a loan.\r\n";

    #[test]
    fn parses_plain_text_email() {
        let email = parse_incoming(RAW_EMAIL.as_bytes(), 7).unwrap();
        assert_eq!(email.sender, "alice@example.com");
        assert_eq!(email.subject, "DIGITAL EMPLOYEE : loan application");
        assert!(email.text.contains("apply for a loan"));
        assert!(email.html.is_empty());
        assert!(email.attachments.is_empty());
        assert!(email.identity.contains("msg-1@example.com"));
    }

    #[test]
    fn identity_stable_across_repeated_parses() {
        let a = parse_incoming(RAW_EMAIL.as_bytes(), 7).unwrap();
        let b = parse_incoming(RAW_EMAIL.as_bytes(), 7).unwrap();
        assert_eq!(a.identity, b.identity);
    }

    #[test]
    fn identity_falls_back_to_sequence_number() {
        let id = derive_identity(None, 42, Some(Utc::now()));
        assert!(id.starts_with("42-"));
    }

    #[test]
    fn identity_ignores_empty_message_id() {
        let id = derive_identity(Some(""), 9, Some(Utc::now()));
        assert!(id.starts_with("9-"));
    }

    #[test]
    fn identity_stable_without_date_header() {
        let raw = "From: bob@example.com\r\n\
            Subject: DIGITAL EMPLOYEE : loan application\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            no date header on this one\r\n";
        let a = parse_incoming(raw.as_bytes(), 4).unwrap();
        let b = parse_incoming(raw.as_bytes(), 4).unwrap();
        assert_eq!(a.identity, b.identity);
        assert!(a.identity.ends_with("-undated"));
    }

    #[test]
    fn html_only_body_is_stripped_to_text() {
        let raw = "From: bob@example.com\r\n\
            Subject: hi\r\n\
            Content-Type: text/html; charset=utf-8\r\n\
            \r\n\
            <p>Hello <b>there</b></p>\r\n";
        let email = parse_incoming(raw.as_bytes(), 1).unwrap();
        assert_eq!(email.text, "Hello there");
        assert!(email.html.contains("<p>"));
    }

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
        assert_eq!(strip_html("No HTML here"), "No HTML here");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn missing_subject_becomes_empty() {
        let raw = "From: bob@example.com\r\n\r\nbody only\r\n";
        let email = parse_incoming(raw.as_bytes(), 3).unwrap();
        assert_eq!(email.subject, "");
    }
}
