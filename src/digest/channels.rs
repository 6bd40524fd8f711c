//! Membership enumeration.

use crate::error::{Result, SlackError};
use crate::messaging::traits::{ChannelLister, ChannelPageRequest};
use crate::Channel;

use std::collections::HashSet;

/// Page size requested from the membership listing.
pub const CHANNEL_PAGE_SIZE: u16 = 100;

/// Every public and private channel `user_id` belongs to, in listing order.
///
/// Pages until the cursor runs out. Any page failure fails the whole listing.
pub async fn list_member_channels<L: ChannelLister>(
    lister: &L,
    user_id: &str,
) -> Result<Vec<Channel>> {
    let mut channels = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut seen_cursors = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let request = ChannelPageRequest {
            user_id: user_id.to_string(),
            cursor: cursor.take(),
            limit: CHANNEL_PAGE_SIZE,
        };
        let page = lister.list_channels_page(&request).await?;
        pages += 1;

        for channel in page.channels {
            if seen_ids.insert(channel.id.clone()) {
                channels.push(channel);
            }
        }

        match page.next_cursor.filter(|next| !next.is_empty()) {
            Some(next) => {
                if !seen_cursors.insert(next.clone()) {
                    return Err(SlackError::ChannelListing {
                        user_id: user_id.to_string(),
                        reason: format!("cursor {next:?} returned twice"),
                    }
                    .into());
                }
                cursor = Some(next);
            }
            None => break,
        }
    }

    tracing::debug!(
        user_id = %user_id,
        pages,
        channels = channels.len(),
        "listed member channels"
    );

    Ok(channels)
}
