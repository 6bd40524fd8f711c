//! Decides whether a message is worth surfacing.
//!
//! Matching is plain substring search over the raw Slack text. A mention token
//! split by formatting is not recognised; that is an accepted limitation.

/// `@here`: notify everyone active in the workspace channel.
pub const HERE_TOKEN: &str = "<!here>";
/// `@channel`: notify every member of the channel.
pub const CHANNEL_TOKEN: &str = "<!channel>";

/// Mention predicate bound to one requesting user.
#[derive(Debug, Clone)]
pub struct MentionFilter {
    user_token: Option<String>,
    /// Stored lowercased.
    secondary_mention: Option<String>,
}

impl MentionFilter {
    pub fn new(user_id: &str, secondary_mention: Option<&str>) -> Self {
        let user_id = user_id.trim();
        Self {
            user_token: (!user_id.is_empty()).then(|| mention_token(user_id)),
            secondary_mention: secondary_mention
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    /// True when `text` broadcasts or mentions the requesting user.
    pub fn matches(&self, text: Option<&str>) -> bool {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return false;
        };

        if text.contains(HERE_TOKEN) || text.contains(CHANNEL_TOKEN) {
            return true;
        }
        if self
            .user_token
            .as_deref()
            .is_some_and(|token| text.contains(token))
        {
            return true;
        }
        self.secondary_mention
            .as_deref()
            .is_some_and(|mention| text.to_lowercase().contains(mention))
    }
}

/// Slack's inline user reference, `<@U123>`.
pub fn mention_token(user_id: &str) -> String {
    format!("<@{user_id}>")
}
