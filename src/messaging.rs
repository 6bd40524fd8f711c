//! Slack Web API collaborators of the digest pipeline.

pub mod slack;
pub mod traits;

pub use slack::SlackAdapter;
pub use traits::{ChannelLister, HistoryFetcher, IdentityLookup, Presenter, Workspace};
