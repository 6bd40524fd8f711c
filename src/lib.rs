//! today-alerts: a Slack slash command that gathers today's `@here`, `@channel`
//! and direct mentions from every channel the caller belongs to.

pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod server;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// A conversation the requesting user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    /// Empty when the platform returns no name.
    pub name: String,
}

/// One history entry as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub channel_id: String,
    /// Absent for system and some bot messages.
    pub author_id: Option<String>,
    /// Platform timestamp, `"<seconds>.<micros>"`. Unique and ordered per channel.
    pub ts: String,
    pub text: Option<String>,
}

impl Message {
    /// Whole seconds of the message timestamp.
    pub fn unix_seconds(&self) -> Option<i64> {
        self.ts.split('.').next()?.parse().ok()
    }
}

/// A resolved author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
}

/// The qualifying messages of one channel, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    pub channel: Channel,
    pub messages: Vec<Message>,
}

/// An invocation of the slash command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    /// Command name including the leading slash, e.g. `/today-alerts`.
    pub command: String,
    pub user_id: String,
    /// Channel the command was typed in. Error notices go here.
    pub channel_id: String,
    /// Short-lived token required to open a modal for this invocation.
    pub trigger_id: String,
    pub text: String,
}
