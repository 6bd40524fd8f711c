//! Per-channel history retrieval and filtering.

use crate::digest::filter::MentionFilter;
use crate::messaging::traits::HistoryFetcher;
use crate::{Channel, ChannelResult};

use futures::StreamExt as _;

/// Fetch today's history of every channel and keep the qualifying messages.
///
/// Channels are fetched with at most `concurrency` requests in flight. A channel
/// whose fetch fails contributes nothing; the others are unaffected. Output
/// order follows `channels`, and only channels with at least one qualifying
/// message appear. Each channel gets a single bounded request, so a channel
/// with more same-day traffic than one page holds is cut at the page limit.
pub async fn collect<F: HistoryFetcher>(
    fetcher: &F,
    channels: Vec<Channel>,
    oldest: i64,
    filter: &MentionFilter,
    concurrency: usize,
) -> Vec<ChannelResult> {
    let scanned = channels.len();

    let results: Vec<ChannelResult> = futures::stream::iter(channels)
        .map(|channel| async move {
            match fetcher.fetch_history(&channel, oldest).await {
                Ok(messages) => {
                    let messages: Vec<_> = messages
                        .into_iter()
                        .filter(|message| filter.matches(message.text.as_deref()))
                        .collect();
                    if messages.is_empty() {
                        None
                    } else {
                        Some(ChannelResult { channel, messages })
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        channel_id = %channel.id,
                        channel_name = %channel.name,
                        %error,
                        "skipping channel, history fetch failed"
                    );
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;

    tracing::debug!(
        scanned,
        matched_channels = results.len(),
        matched_messages = results.iter().map(|r| r.messages.len()).sum::<usize>(),
        "collected channel history"
    );

    results
}
