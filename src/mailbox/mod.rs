//! IMAP monitoring and SMTP delivery.

pub mod imap;
pub mod monitor;
pub mod smtp;
pub mod types;

pub use monitor::{MailboxMonitor, MonitorState};
pub use smtp::{OutgoingReply, ReplySender, SmtpReplySender};
pub use types::{Attachment, IncomingEmail};
