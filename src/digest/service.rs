//! One slash command invocation, end to end.

use crate::config::DigestConfig;
use crate::digest::assemble::{Assembler, ModalView, RenderBlock};
use crate::digest::filter::MentionFilter;
use crate::digest::window::DayZone;
use crate::digest::{channels, history, identity};
use crate::error::Result;
use crate::messaging::traits::{Presenter, Workspace};
use crate::SlashCommand;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Sent privately when the digest cannot be produced.
pub const FAILURE_NOTICE: &str = "Sorry, I could not fetch today’s messages across your channels.";

/// Builds digests against a workspace and shows them through a presenter.
pub struct DigestService<W, P> {
    workspace: Arc<W>,
    presenter: Arc<P>,
    settings: DigestConfig,
}

impl<W: Workspace, P: Presenter> DigestService<W, P> {
    pub fn new(workspace: Arc<W>, presenter: Arc<P>, settings: DigestConfig) -> Self {
        Self {
            workspace,
            presenter,
            settings,
        }
    }

    fn zone(&self) -> DayZone {
        DayZone::from(self.settings.timezone)
    }

    /// Build today's digest for `user_id`.
    pub async fn build_digest(&self, user_id: &str) -> Result<Vec<RenderBlock>> {
        let zone = self.zone();
        self.build_digest_since(user_id, zone, zone.start_of_today()).await
    }

    /// Build the digest for `user_id` for the day containing `now`.
    pub async fn build_digest_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RenderBlock>> {
        let zone = self.zone();
        self.build_digest_since(user_id, zone, zone.start_of_day(now)).await
    }

    /// Only the membership listing can fail the run; history and identity
    /// failures drop the affected item.
    async fn build_digest_since(
        &self,
        user_id: &str,
        zone: DayZone,
        oldest: i64,
    ) -> Result<Vec<RenderBlock>> {
        let filter = MentionFilter::new(user_id, self.settings.secondary_mention.as_deref());

        let channels = channels::list_member_channels(self.workspace.as_ref(), user_id).await?;

        let results = history::collect(
            self.workspace.as_ref(),
            channels,
            oldest,
            &filter,
            self.settings.concurrency,
        )
        .await;

        let identities = identity::resolve(
            self.workspace.as_ref(),
            identity::author_ids(&results),
            self.settings.concurrency,
        )
        .await;

        let assembler = Assembler {
            max_messages: self.settings.max_messages,
            max_text_chars: self.settings.max_text_chars,
            zone,
            secondary_mention: self.settings.secondary_mention.clone(),
        };
        Ok(assembler.assemble(results, &identities))
    }

    /// Build the digest and open it as a modal.
    pub async fn present(&self, command: &SlashCommand) -> Result<()> {
        let blocks = self.build_digest(&command.user_id).await?;
        let view = ModalView::digest(blocks);
        self.presenter.open_modal(&command.trigger_id, &view).await
    }

    /// Top-level handler. Failures are logged and answered with one private
    /// notice; if that notice cannot be sent either, there is nobody left to tell.
    pub async fn handle(&self, command: &SlashCommand) {
        let started = Instant::now();

        match self.present(command).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %command.user_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "digest delivered"
                );
            }
            Err(error) => {
                tracing::error!(
                    user_id = %command.user_id,
                    channel_id = %command.channel_id,
                    %error,
                    "failed to deliver digest"
                );
                if let Err(error) = self
                    .presenter
                    .post_ephemeral(&command.channel_id, &command.user_id, FAILURE_NOTICE)
                    .await
                {
                    tracing::warn!(%error, "failed to send failure notice");
                }
            }
        }
    }
}
