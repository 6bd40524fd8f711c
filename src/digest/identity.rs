//! Author identity resolution.

use crate::messaging::traits::IdentityLookup;
use crate::{ChannelResult, UserIdentity};

use futures::StreamExt as _;
use std::collections::{BTreeSet, HashMap};

/// Distinct author ids across all results. System messages without an
/// author contribute nothing.
pub fn author_ids(results: &[ChannelResult]) -> BTreeSet<String> {
    results
        .iter()
        .flat_map(|result| &result.messages)
        .filter_map(|message| message.author_id.clone())
        .collect()
}

/// Look up every id once. Ids whose lookup fails or finds no user are left
/// out of the map; the formatter falls back for them.
pub async fn resolve<L: IdentityLookup>(
    lookup: &L,
    author_ids: BTreeSet<String>,
    concurrency: usize,
) -> HashMap<String, UserIdentity> {
    let requested = author_ids.len();

    let identities: HashMap<String, UserIdentity> = futures::stream::iter(author_ids)
        .map(|user_id| async move {
            match lookup.lookup_user(&user_id).await {
                Ok(Some(identity)) => Some((user_id, identity)),
                Ok(None) => {
                    tracing::debug!(user_id = %user_id, "user not found");
                    None
                }
                Err(error) => {
                    tracing::debug!(user_id = %user_id, %error, "user lookup failed");
                    None
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;

    tracing::debug!(requested, resolved = identities.len(), "resolved author identities");

    identities
}
