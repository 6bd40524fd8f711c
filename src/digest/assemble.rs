//! Turns collected results into an ordered, capped list of render blocks.

use crate::digest::filter::mention_token;
use crate::digest::window::DayZone;
use crate::{ChannelResult, Message, UserIdentity};

use std::collections::HashMap;

pub const DIGEST_TITLE: &str = "*Today’s important messages across your channels*";
pub const MODAL_TITLE: &str = "Today’s Mentions";
pub const MODAL_CLOSE: &str = "Close";
pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const ELLIPSIS: &str = "...";

/// Presentation-agnostic unit of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBlock {
    /// Digest heading.
    Title(String),
    /// `*#name*` line introducing a channel.
    ChannelHeader(String),
    Divider,
    /// One formatted message: `*HH:MM* – *author*` then the text.
    Message(String),
    /// Empty-digest or truncation notice.
    Notice(String),
}

impl RenderBlock {
    pub fn is_message(&self) -> bool {
        matches!(self, RenderBlock::Message(_))
    }
}

/// A modal ready to hand to a [`Presenter`](crate::messaging::traits::Presenter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub title: String,
    pub close: String,
    pub blocks: Vec<RenderBlock>,
}

impl ModalView {
    pub fn digest(blocks: Vec<RenderBlock>) -> Self {
        Self {
            title: MODAL_TITLE.into(),
            close: MODAL_CLOSE.into(),
            blocks,
        }
    }
}

/// Ways of naming a message author, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthorStrategy {
    /// The identity's display name.
    ResolvedName,
    /// Slack's `<@U123>` token, which clients render as the user's handle.
    MentionToken,
}

const AUTHOR_STRATEGIES: [AuthorStrategy; 2] =
    [AuthorStrategy::ResolvedName, AuthorStrategy::MentionToken];

impl AuthorStrategy {
    fn label(
        self,
        author_id: Option<&str>,
        identities: &HashMap<String, UserIdentity>,
    ) -> Option<String> {
        let author_id = author_id.filter(|id| !id.is_empty())?;
        match self {
            AuthorStrategy::ResolvedName => identities
                .get(author_id)
                .map(|identity| identity.display_name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            AuthorStrategy::MentionToken => Some(mention_token(author_id)),
        }
    }
}

/// Author label for a message, ending at [`UNKNOWN_AUTHOR`].
pub fn author_label(author_id: Option<&str>, identities: &HashMap<String, UserIdentity>) -> String {
    AUTHOR_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.label(author_id, identities))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

/// Cut `text` to `max_chars` characters, the last three being `...`.
/// Text that fits is returned unchanged.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Rendering settings for one digest.
#[derive(Debug, Clone)]
pub struct Assembler {
    pub max_messages: usize,
    pub max_text_chars: usize,
    pub zone: DayZone,
    /// Listed in the empty-digest notice when set.
    pub secondary_mention: Option<String>,
}

impl Assembler {
    /// Build the block list. Channels are sorted by name; messages keep the
    /// order they were collected in. Rendering stops once `max_messages`
    /// message blocks exist, possibly inside a channel, and a notice follows.
    pub fn assemble(
        &self,
        mut results: Vec<ChannelResult>,
        identities: &HashMap<String, UserIdentity>,
    ) -> Vec<RenderBlock> {
        let mut blocks = vec![RenderBlock::Title(DIGEST_TITLE.into()), RenderBlock::Divider];

        if results.is_empty() {
            blocks.push(RenderBlock::Notice(self.empty_notice()));
            return blocks;
        }

        // Stable, so equal names keep collection order.
        results.sort_by(|a, b| a.channel.name.cmp(&b.channel.name));

        let mut count = 0usize;
        'channels: for result in &results {
            if count >= self.max_messages {
                break;
            }
            blocks.push(RenderBlock::ChannelHeader(format!("*#{}*", result.channel.name)));
            blocks.push(RenderBlock::Divider);

            for message in &result.messages {
                if count >= self.max_messages {
                    break 'channels;
                }
                blocks.push(RenderBlock::Message(self.format_line(message, identities)));
                blocks.push(RenderBlock::Divider);
                count += 1;
            }
        }

        if count >= self.max_messages {
            blocks.push(RenderBlock::Notice(format!(
                "_Showing first {} messages for today. Consider narrowing with a specific channel if needed._",
                self.max_messages
            )));
        }

        blocks
    }

    /// `*HH:MM* – *author*` followed by the possibly truncated text.
    pub fn format_line(
        &self,
        message: &Message,
        identities: &HashMap<String, UserIdentity>,
    ) -> String {
        let author = author_label(message.author_id.as_deref(), identities);
        let time = message
            .unix_seconds()
            .and_then(|seconds| self.zone.clock(seconds))
            .unwrap_or_else(|| "--:--".to_string());
        let text = truncate_text(message.text.as_deref().unwrap_or_default(), self.max_text_chars);
        format!("*{time}* – *{author}*\n{text}")
    }

    fn empty_notice(&self) -> String {
        match &self.secondary_mention {
            Some(mention) => format!(
                "No messages today with `@here`, `@channel`, a direct mention of you, or `{mention}` in any of your channels."
            ),
            None => "No messages today with `@here`, `@channel`, or a direct mention of you in any of your channels.".to_string(),
        }
    }
}
