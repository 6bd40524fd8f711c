//! Slack Web API adapter using slack-morphism.
//!
//! ## Calls
//!
//! - `users.conversations`: paginated membership listing (public + private channels)
//! - `conversations.history`: one bounded page per channel from the start of the day
//! - `users.info`: author display names
//! - `views.open`: the digest modal
//! - `chat.postEphemeral`: the private failure notice
//! - `auth.test`: startup health check

use crate::digest::{ModalView, RenderBlock};
use crate::error::SlackError;
use crate::messaging::traits::{
    ChannelLister, ChannelPage, ChannelPageRequest, HistoryFetcher, IdentityLookup, Presenter,
};
use crate::{Channel, Message, UserIdentity};

use anyhow::Context as _;
use slack_morphism::prelude::*;
use std::sync::Arc;

/// Slack rejects modals with more blocks than this.
const MAX_MODAL_BLOCKS: usize = 100;

/// Slack's limit on the text of one section block.
const MAX_SECTION_CHARS: usize = 3000;

/// Slack adapter.
pub struct SlackAdapter {
    /// Shared HTTP client, reused across all API calls.
    client: Arc<SlackHyperClient>,
    /// Pre-built API token wrapping the bot token.
    token: SlackApiToken,
    /// Page size of the single history request per channel.
    history_limit: u16,
}

impl SlackAdapter {
    pub fn new(bot_token: impl Into<String>, history_limit: u16) -> anyhow::Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("failed to create slack HTTP connector")?,
        ));
        let token = SlackApiToken::new(SlackApiTokenValue(bot_token.into()));
        Ok(Self {
            client,
            token,
            history_limit,
        })
    }

    /// Open a session against the cached client using the cached bot token.
    fn session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.token)
    }

    /// Verify the bot token and return the bot's user id.
    pub async fn health_check(&self) -> crate::Result<String> {
        let response = self
            .session()
            .auth_test()
            .await
            .context("slack auth.test failed")?;
        Ok(response.user_id.0)
    }
}

impl ChannelLister for SlackAdapter {
    async fn list_channels_page(&self, request: &ChannelPageRequest) -> crate::Result<ChannelPage> {
        let response = self
            .session()
            .users_conversations(&users_conversations_request(request))
            .await
            .map_err(|error| SlackError::ChannelListing {
                user_id: request.user_id.clone(),
                reason: error.to_string(),
            })?;

        let channels = response
            .channels
            .into_iter()
            .map(|info| Channel {
                id: info.id.0,
                name: info.name.unwrap_or_default(),
            })
            .collect();
        let next_cursor = response
            .response_metadata
            .and_then(|metadata| metadata.next_cursor)
            .map(|cursor| cursor.0);

        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }
}

impl HistoryFetcher for SlackAdapter {
    async fn fetch_history(&self, channel: &Channel, oldest: i64) -> crate::Result<Vec<Message>> {
        let req = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel.id.clone()))
            .with_oldest(SlackTs(oldest.to_string()))
            .with_inclusive(true)
            .with_limit(self.history_limit);

        let response = self
            .session()
            .conversations_history(&req)
            .await
            .map_err(|error| SlackError::History {
                channel_id: channel.id.clone(),
                reason: error.to_string(),
            })?;

        let messages: Vec<Message> = response
            .messages
            .into_iter()
            .map(|msg| Message {
                channel_id: channel.id.clone(),
                author_id: msg.sender.user.map(|user| user.0),
                ts: msg.origin.ts.0,
                text: msg.content.text,
            })
            .collect();

        tracing::trace!(
            count = messages.len(),
            channel_id = %channel.id,
            "fetched slack channel history"
        );

        Ok(messages)
    }
}

impl IdentityLookup for SlackAdapter {
    async fn lookup_user(&self, user_id: &str) -> crate::Result<Option<UserIdentity>> {
        let response = self
            .session()
            .users_info(&SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string())))
            .await
            .map_err(|error| SlackError::UserLookup {
                user_id: user_id.to_string(),
                reason: error.to_string(),
            })?;

        // Only the real name counts; without one the digest falls back to `<@id>`.
        let user = &response.user;
        let display_name = pick_display_name([
            user.real_name.as_deref(),
            user.profile.as_ref().and_then(|p| p.real_name.as_deref()),
        ]);

        Ok(display_name.map(|display_name| UserIdentity {
            id: user_id.to_string(),
            display_name,
        }))
    }
}

impl Presenter for SlackAdapter {
    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> crate::Result<()> {
        let slack_view: SlackView = serde_json::from_value(modal_json(view))
            .map_err(|error| SlackError::InvalidView(error.to_string()))?;

        let req = SlackApiViewsOpenRequest::new(SlackTriggerId(trigger_id.to_string()), slack_view);
        self.session()
            .views_open(&req)
            .await
            .map_err(|error| SlackError::Presentation(format!("views.open: {error}")))?;
        Ok(())
    }

    async fn post_ephemeral(&self, channel_id: &str, user_id: &str, text: &str) -> crate::Result<()> {
        let req = SlackApiChatPostEphemeralRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackUserId(user_id.to_string()),
            SlackMessageContent::new().with_text(text.to_string()),
        );
        self.session()
            .chat_post_ephemeral(&req)
            .await
            .context("failed to send slack ephemeral message")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Membership listing request, restricted to public and private channels.
fn users_conversations_request(request: &ChannelPageRequest) -> SlackApiUsersConversationsRequest {
    SlackApiUsersConversationsRequest::new()
        .with_user(SlackUserId(request.user_id.clone()))
        .with_types(vec![
            SlackConversationType::Public,
            SlackConversationType::Private,
        ])
        .with_limit(request.limit)
        .opt_cursor(request.cursor.clone().map(SlackCursorId))
}

/// First non-blank candidate, trimmed.
fn pick_display_name<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

/// One Block Kit element of the modal body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModalPiece {
    Section(String),
    Divider,
}

/// Replaces the tail of a digest that cannot fit in one modal.
const OVERFLOW_NOTICE: &str =
    "_Too many messages to show in one view. Lower `max_messages` to see a complete digest._";

/// Map render blocks onto Block Kit pieces that fit in one modal.
///
/// Dividers go first when the block limit is exceeded; if that is not enough,
/// adjacent sections are merged up to the section text limit. Whatever still
/// does not fit is cut, and the last piece becomes [`OVERFLOW_NOTICE`].
fn layout_blocks(blocks: &[RenderBlock]) -> Vec<ModalPiece> {
    let pieces: Vec<ModalPiece> = blocks
        .iter()
        .map(|block| match block {
            RenderBlock::Divider => ModalPiece::Divider,
            RenderBlock::Title(text)
            | RenderBlock::ChannelHeader(text)
            | RenderBlock::Message(text)
            | RenderBlock::Notice(text) => ModalPiece::Section(text.clone()),
        })
        .collect();
    if pieces.len() <= MAX_MODAL_BLOCKS {
        return pieces;
    }

    let sections: Vec<String> = pieces
        .into_iter()
        .filter_map(|piece| match piece {
            ModalPiece::Section(text) => Some(text),
            ModalPiece::Divider => None,
        })
        .collect();
    if sections.len() <= MAX_MODAL_BLOCKS {
        return sections.into_iter().map(ModalPiece::Section).collect();
    }

    tracing::debug!(
        sections = sections.len(),
        "merging sections to fit slack modal block limit"
    );

    let mut merged = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    for text in sections {
        let chars = text.chars().count();
        if !current.is_empty() && current_chars + 2 + chars > MAX_SECTION_CHARS {
            merged.push(ModalPiece::Section(std::mem::take(&mut current)));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(&text);
        current_chars += chars;
    }
    if !current.is_empty() {
        merged.push(ModalPiece::Section(current));
    }

    if merged.len() > MAX_MODAL_BLOCKS {
        tracing::warn!(
            pieces = merged.len(),
            "digest exceeds slack modal block limit, cutting"
        );
        merged.truncate(MAX_MODAL_BLOCKS - 1);
        merged.push(ModalPiece::Section(OVERFLOW_NOTICE.to_string()));
    }
    merged
}

/// Block Kit JSON for a modal view.
fn modal_json(view: &ModalView) -> serde_json::Value {
    let blocks: Vec<serde_json::Value> = layout_blocks(&view.blocks)
        .into_iter()
        .map(|piece| match piece {
            ModalPiece::Section(text) => serde_json::json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": text },
            }),
            ModalPiece::Divider => serde_json::json!({ "type": "divider" }),
        })
        .collect();

    serde_json::json!({
        "type": "modal",
        "title": { "type": "plain_text", "text": view.title, "emoji": true },
        "close": { "type": "plain_text", "text": view.close, "emoji": true },
        "blocks": blocks,
    })
}
