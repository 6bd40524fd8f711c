//! Collaborator traits the digest pipeline is written against.
//!
//! The Slack adapter implements all of them; tests substitute in-memory fakes.

use crate::digest::ModalView;
use crate::error::Result;
use crate::{Channel, Message, UserIdentity};

use std::future::Future;

/// One request against the paginated membership listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPageRequest {
    pub user_id: String,
    /// Continuation cursor from the previous page, `None` for the first page.
    pub cursor: Option<String>,
    pub limit: u16,
}

/// One page of the membership listing.
#[derive(Debug, Clone, Default)]
pub struct ChannelPage {
    pub channels: Vec<Channel>,
    /// Absent or empty when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Lists the public and private channels a user belongs to.
pub trait ChannelLister: Send + Sync + 'static {
    fn list_channels_page(
        &self,
        request: &ChannelPageRequest,
    ) -> impl Future<Output = Result<ChannelPage>> + Send;
}

/// Fetches one bounded page of a channel's history.
pub trait HistoryFetcher: Send + Sync + 'static {
    /// Messages with a timestamp at or after `oldest` (Unix seconds),
    /// newest first.
    fn fetch_history(
        &self,
        channel: &Channel,
        oldest: i64,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;
}

/// Resolves a user id to a display identity.
pub trait IdentityLookup: Send + Sync + 'static {
    /// `Ok(None)` when the platform knows no such user.
    fn lookup_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<UserIdentity>>> + Send;
}

/// Everything a digest run reads from the workspace.
pub trait Workspace: ChannelLister + HistoryFetcher + IdentityLookup {}

impl<T: ChannelLister + HistoryFetcher + IdentityLookup> Workspace for T {}

/// Shows results to the requesting user.
pub trait Presenter: Send + Sync + 'static {
    /// Open a modal in response to a command's trigger.
    fn open_modal(
        &self,
        trigger_id: &str,
        view: &ModalView,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Post a message only `user_id` can see in `channel_id`.
    fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
