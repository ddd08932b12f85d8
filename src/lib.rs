//! Digital Employee — email-driven task router.

pub mod actions;
pub mod analysis;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mailbox;
pub mod matcher;
pub mod statement;
