//! Outbound reply delivery over SMTP via lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::config::AppConfig;
use crate::error::DeliveryError;

/// A composed reply ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingReply {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Delivery sink for composed replies.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, reply: OutgoingReply) -> Result<(), DeliveryError>;
}

/// Reply-convention subject: prefix with "Re:" unless already present.
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// SMTP delivery via a configured relay.
pub struct SmtpReplySender {
    host: String,
    port: u16,
    secure: bool,
    user: String,
    password: SecretString,
}

impl SmtpReplySender {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            secure: config.smtp_secure,
            user: config.user.clone(),
            password: config.password.clone(),
        }
    }

    /// Build the transport and submit one message. Blocking — run inside
    /// `spawn_blocking`.
    fn send_blocking(&self, reply: &OutgoingReply) -> Result<(), DeliveryError> {
        let creds = Credentials::new(
            self.user.clone(),
            self.password.expose_secret().to_string(),
        );

        let builder = if self.secure {
            SmtpTransport::relay(&self.host).map_err(|e| DeliveryError::Relay(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(&self.host)
        };
        let transport = builder.port(self.port).credentials(creds).build();

        let message = compose_message(&self.user, reply)?;

        transport
            .send(&message)
            .map_err(|e| DeliveryError::Send(e.to_string()))?;

        info!(to = %reply.to, subject = %reply.subject, "Reply sent");
        Ok(())
    }
}

/// Compose the outbound message: plain text, or multipart/alternative when
/// an HTML body is present.
fn compose_message(user: &str, reply: &OutgoingReply) -> Result<Message, DeliveryError> {
    let from: Mailbox = format!("\"Digital Employee\" <{user}>")
        .parse()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: user.to_string(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = reply
        .to
        .parse()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: reply.to.clone(),
            reason: format!("{e}"),
        })?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(reply.subject.clone());

    match &reply.html {
        Some(html) => builder
            .multipart(MultiPart::alternative_plain_html(
                reply.text.clone(),
                html.clone(),
            ))
            .map_err(|e| DeliveryError::Build(e.to_string())),
        None => builder
            .body(reply.text.clone())
            .map_err(|e| DeliveryError::Build(e.to_string())),
    }
}

#[async_trait]
impl ReplySender for SmtpReplySender {
    async fn send(&self, reply: OutgoingReply) -> Result<(), DeliveryError> {
        let sender = Self {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            user: self.user.clone(),
            password: self.password.clone(),
        };
        tokio::task::spawn_blocking(move || sender.send_blocking(&reply))
            .await
            .map_err(|e| DeliveryError::Send(format!("send task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_subject_adds_prefix() {
        assert_eq!(
            reply_subject("DIGITAL EMPLOYEE : loan application"),
            "Re: DIGITAL EMPLOYEE : loan application"
        );
    }

    #[test]
    fn reply_subject_keeps_existing_prefix() {
        assert_eq!(reply_subject("Re: already a reply"), "Re: already a reply");
    }

    #[test]
    fn reply_subject_empty_subject() {
        assert_eq!(reply_subject(""), "Re: ");
    }

    #[test]
    fn composes_plain_text_message() {
        let reply = OutgoingReply {
            to: "alice@example.com".into(),
            subject: "Re: hello".into(),
            text: "plain body".into(),
            html: None,
        };
        let message = compose_message("clerk@bank.example", &reply).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Digital Employee"));
        assert!(formatted.contains("plain body"));
        assert!(!formatted.contains("multipart/alternative"));
    }

    #[test]
    fn html_reply_composes_multipart_alternative() {
        let reply = OutgoingReply {
            to: "alice@example.com".into(),
            subject: "Your Report".into(),
            text: "see html".into(),
            html: Some("<p>report</p>".into()),
        };
        let message = compose_message("clerk@bank.example", &reply).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("see html"));
        assert!(formatted.contains("<p>report</p>"));
    }

    #[test]
    fn bad_recipient_is_an_address_error() {
        let reply = OutgoingReply {
            to: "not an address".into(),
            subject: "x".into(),
            text: "y".into(),
            html: None,
        };
        let err = compose_message("clerk@bank.example", &reply).unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }
}
