//! In-memory collaborators for pipeline tests.

use crate::digest::ModalView;
use crate::error::{Result, SlackError};
use crate::messaging::traits::{
    ChannelLister, ChannelPage, ChannelPageRequest, HistoryFetcher, IdentityLookup, Presenter,
};
use crate::{Channel, Message, UserIdentity};

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

pub fn message(channel_id: &str, author_id: Option<&str>, ts: &str, text: &str) -> Message {
    Message {
        channel_id: channel_id.into(),
        author_id: author_id.map(str::to_string),
        ts: ts.into(),
        text: Some(text.into()),
    }
}

/// Pages are served by call order; page `n` points at `page-{n+1}`.
#[derive(Default)]
pub struct FakeWorkspace {
    channel_pages: Vec<Vec<Channel>>,
    fixed_cursor: Option<String>,
    fail_listing_at: Option<usize>,
    histories: HashMap<String, Vec<Message>>,
    failing_histories: HashSet<String>,
    users: HashMap<String, UserIdentity>,
    failing_users: HashSet<String>,
    page_requests: Mutex<Vec<ChannelPageRequest>>,
    history_calls: Mutex<Vec<(String, i64)>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_pages(mut self, pages: Vec<Vec<(&str, &str)>>) -> Self {
        self.channel_pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|(id, name)| Channel {
                        id: id.into(),
                        name: name.into(),
                    })
                    .collect()
            })
            .collect();
        self
    }

    pub fn with_fixed_cursor(mut self, cursor: &str) -> Self {
        self.fixed_cursor = Some(cursor.into());
        self
    }

    pub fn failing_listing_at_page(mut self, page: usize) -> Self {
        self.fail_listing_at = Some(page);
        self
    }

    /// `messages` newest first, as Slack returns them.
    pub fn with_history(mut self, channel_id: &str, messages: Vec<Message>) -> Self {
        self.histories.insert(channel_id.into(), messages);
        self
    }

    pub fn failing_history(mut self, channel_id: &str) -> Self {
        self.failing_histories.insert(channel_id.into());
        self
    }

    pub fn with_user(mut self, user_id: &str, display_name: &str) -> Self {
        self.users.insert(
            user_id.into(),
            UserIdentity {
                id: user_id.into(),
                display_name: display_name.into(),
            },
        );
        self
    }

    pub fn failing_user(mut self, user_id: &str) -> Self {
        self.failing_users.insert(user_id.into());
        self
    }

    pub fn page_requests(&self) -> Vec<ChannelPageRequest> {
        self.page_requests.lock().clone()
    }

    pub fn history_calls(&self) -> Vec<(String, i64)> {
        self.history_calls.lock().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }
}

impl ChannelLister for FakeWorkspace {
    async fn list_channels_page(&self, request: &ChannelPageRequest) -> Result<ChannelPage> {
        let index = {
            let mut requests = self.page_requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };

        if self.fail_listing_at == Some(index) {
            return Err(SlackError::ChannelListing {
                user_id: request.user_id.clone(),
                reason: "missing_scope".into(),
            }
            .into());
        }

        let channels = self.channel_pages.get(index).cloned().unwrap_or_default();
        let next_cursor = match &self.fixed_cursor {
            Some(cursor) => Some(cursor.clone()),
            None if index + 1 < self.channel_pages.len() => Some(format!("page-{}", index + 1)),
            None => Some(String::new()),
        };
        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }
}

impl HistoryFetcher for FakeWorkspace {
    async fn fetch_history(&self, channel: &Channel, oldest: i64) -> Result<Vec<Message>> {
        self.history_calls.lock().push((channel.id.clone(), oldest));

        if self.failing_histories.contains(&channel.id) {
            return Err(SlackError::History {
                channel_id: channel.id.clone(),
                reason: "not_in_channel".into(),
            }
            .into());
        }

        Ok(self
            .histories
            .get(&channel.id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.unix_seconds().is_some_and(|s| s >= oldest))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl IdentityLookup for FakeWorkspace {
    async fn lookup_user(&self, user_id: &str) -> Result<Option<UserIdentity>> {
        self.lookups.lock().push(user_id.to_string());

        if self.failing_users.contains(user_id) {
            return Err(SlackError::UserLookup {
                user_id: user_id.to_string(),
                reason: "user_not_visible".into(),
            }
            .into());
        }
        Ok(self.users.get(user_id).cloned())
    }
}

#[derive(Default)]
pub struct FakePresenter {
    pub fail_modal: bool,
    pub fail_ephemeral: bool,
    pub opened: Mutex<Vec<(String, ModalView)>>,
    pub posted: Mutex<Vec<(String, String, String)>>,
}

impl FakePresenter {
    pub fn modals(&self) -> Vec<(String, ModalView)> {
        self.opened.lock().clone()
    }

    pub fn ephemerals(&self) -> Vec<(String, String, String)> {
        self.posted.lock().clone()
    }
}

impl Presenter for FakePresenter {
    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<()> {
        if self.fail_modal {
            return Err(SlackError::Presentation("expired_trigger_id".into()).into());
        }
        self.opened.lock().push((trigger_id.to_string(), view.clone()));
        Ok(())
    }

    async fn post_ephemeral(&self, channel_id: &str, user_id: &str, text: &str) -> Result<()> {
        self.posted
            .lock()
            .push((channel_id.to_string(), user_id.to_string(), text.to_string()));
        if self.fail_ephemeral {
            return Err(SlackError::Presentation("channel_not_found".into()).into());
        }
        Ok(())
    }
}
